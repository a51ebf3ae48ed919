// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Process entry point: parses the CLI, initializes logging, builds the
//! composition root, and dispatches to one of the three subcommands
//! (`spec.md` §1/§5).

use std::fs;
use std::process::ExitCode;

use ingestion::application::Outcome;
use ingestion::infrastructure::logging;
use ingestion_bootstrap::composition_root::AppContext;
use ingestion_bootstrap::shutdown::ShutdownCoordinator;
use ingestion_bootstrap::{cli::ValidatedCommand, exit_code, signals};
use ingestion_domain::entities::MessageEnvelope;
use ingestion_domain::error::IngestionError;
use ingestion_domain::value_objects::{ClientId, InterfaceId, Priority};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match ingestion_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("invalid invocation: {err}");
            return ExitCode::from(64); // EX_USAGE
        }
    };

    logging::init(cli.json_logs);

    let run_env = cli.config.as_ref().and_then(|p| p.to_str());
    exit_code::result_to_exit_code(run(run_env, cli.command).await)
}

async fn run(run_env: Option<&str>, command: ValidatedCommand) -> Result<(), IngestionError> {
    let context = AppContext::build(run_env).await?;

    match command {
        ValidatedCommand::ValidateConfig => {
            tracing::info!("configuration loaded and validated");
            Ok(())
        }
        ValidatedCommand::Run => run_worker(context).await,
        ValidatedCommand::ProcessFile { file, interface_id, client_id } => {
            process_file_offline(&context, file, &interface_id, &client_id).await
        }
    }
}

async fn run_worker(context: AppContext) -> Result<(), IngestionError> {
    let grace = context.worker_pool_config.shutdown_grace;
    let coordinator = ShutdownCoordinator::new(grace);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(signals::wait_and_initiate_shutdown(coordinator.clone()));

    let bridge_token = coordinator.token();
    tokio::spawn(async move {
        bridge_token.cancelled().await;
        let _ = shutdown_tx.send(true);
    });

    let pool = context.worker_pool();
    let result = pool.run(shutdown_rx).await;
    coordinator.complete_shutdown();
    result
}

async fn process_file_offline(
    context: &AppContext,
    file: std::path::PathBuf,
    interface_id: &str,
    client_id: &str,
) -> Result<(), IngestionError> {
    let bytes = fs::read(&file).map_err(|e| IngestionError::configuration(format!("reading {}: {e}", file.display())))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.xml")
        .to_string();

    let envelope = MessageEnvelope::new(
        bytes,
        file_name,
        ClientId::parse(client_id)?,
        InterfaceId::parse(interface_id)?,
        Priority::Normal,
    );

    match context.orchestrator.process_with_timeout(envelope).await {
        Some(Outcome::Success) => {
            tracing::info!("file processed successfully");
            Ok(())
        }
        Some(Outcome::Error(err)) => {
            tracing::error!(error = %err, "file processing failed");
            Err(err)
        }
        None => Err(IngestionError::Timeout("offline replay exceeded the per-message timeout".to_string())),
    }
}
