// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-line interface (`SPEC_FULL.md` §1 ambient-stack CLI note):
//! `clap` derive parsing plus a thin validation pass, exposing three
//! subcommands - run the worker, validate a config file, and replay a
//! single file offline against the configured database without touching
//! the broker (useful for debugging a stuck `ProcessedFile`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ingestion-worker", version, about = "XML document ingestion pipeline")]
pub struct Cli {
    /// Path to a layered TOML config file; overrides the default
    /// `config/default.toml` + `config/{RUN_ENV}.toml` search (`spec.md` §6).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the worker pool: consume the three priority queues and drive
    /// every inbound message through the pipeline until shut down.
    Run,

    /// Load and sanity-check a configuration file: parses every key group
    /// in `spec.md` §6, then checks circuit breaker thresholds are in range
    /// and `xml.validation.schemaBasePath` exists on disk (`SPEC_FULL.md`
    /// "Config validation at startup", the one `spec.md` §7 fatal-error class).
    ValidateConfig,

    /// Replay one XML file through the pipeline offline, against the
    /// configured database, without publishing to or consuming from the
    /// message bus. Prints the resulting `ProcessedFile` outcome.
    ProcessFile {
        /// Path to the XML file to replay.
        file: PathBuf,

        /// Interface the file should be validated/mapped against.
        #[arg(long)]
        interface_id: String,

        /// Client the file is attributed to.
        #[arg(long)]
        client_id: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),
}

/// Parsed and lightly validated CLI invocation, ready to hand to the
/// composition root.
#[derive(Debug)]
pub struct ValidatedCli {
    pub config: Option<PathBuf>,
    pub json_logs: bool,
    pub command: ValidatedCommand,
}

#[derive(Debug)]
pub enum ValidatedCommand {
    Run,
    ValidateConfig,
    ProcessFile {
        file: PathBuf,
        interface_id: String,
        client_id: String,
    },
}

/// Parses `std::env::args()` with `clap`, then validates path arguments
/// exist where the command requires it to (config files and the command
/// itself are otherwise resolved later against the layered config loader).
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate(Cli::parse())
}

fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if let Some(ref path) = cli.config {
        if !path.exists() {
            return Err(ParseError::PathNotFound(path.clone()));
        }
    }

    let command = match cli.command {
        Commands::Run => ValidatedCommand::Run,
        Commands::ValidateConfig => ValidatedCommand::ValidateConfig,
        Commands::ProcessFile { file, interface_id, client_id } => {
            if !file.exists() {
                return Err(ParseError::PathNotFound(file));
            }
            if interface_id.trim().is_empty() {
                return Err(ParseError::InvalidValue {
                    arg: "interface-id".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            if client_id.trim().is_empty() {
                return Err(ParseError::InvalidValue {
                    arg: "client-id".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            ValidatedCommand::ProcessFile { file, interface_id, client_id }
        }
    };

    Ok(ValidatedCli { config: cli.config, json_logs: cli.json_logs, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_needs_no_further_validation() {
        let cli = Cli { config: None, json_logs: false, command: Commands::Run };
        let validated = validate(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Run));
    }

    #[test]
    fn process_file_rejects_missing_file() {
        let cli = Cli {
            config: None,
            json_logs: false,
            command: Commands::ProcessFile {
                file: PathBuf::from("/no/such/file.xml"),
                interface_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
                client_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            },
        };
        assert!(matches!(validate(cli), Err(ParseError::PathNotFound(_))));
    }

    #[test]
    fn process_file_rejects_blank_interface_id() {
        let existing = std::env::current_exe().expect("current_exe always resolves in test process");
        let cli = Cli {
            config: None,
            json_logs: false,
            command: Commands::ProcessFile { file: existing, interface_id: "  ".to_string(), client_id: "x".to_string() },
        };
        assert!(matches!(validate(cli), Err(ParseError::InvalidValue { .. })));
    }
}
