// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Composition root and process-lifecycle glue for the XML ingestion
//! worker (`SPEC_FULL.md` §1).
//!
//! This crate sits outside `ingestion-domain`/`ingestion`: it is the one
//! place allowed to know about every concrete adapter, and owns everything
//! that is specific to running as an OS process rather than a library -
//! argument parsing, signal handling, exit codes, and wiring the
//! composition root together for `main` to drive.
//!
//! - `cli` - argument parsing and validation (`clap`)
//! - `composition_root` - builds every adapter behind `ingestion_domain`'s
//!   ports and assembles the [`ingestion::application::PipelineOrchestrator`]
//! - `exit_code` - maps an [`ingestion_domain::error::IngestionError`] to a
//!   `sysexits.h`-style process exit code
//! - `logger` - a small `BootstrapLogger` trait for bootstrap-phase
//!   messages that predate the `tracing` subscriber being initialized
//! - `platform` - OS abstraction used by bootstrap-only concerns
//! - `shutdown` - cancellation-token-based graceful shutdown coordination
//! - `signals` - SIGTERM/SIGINT/SIGHUP (Ctrl-C on Windows) handling

pub mod cli;
pub mod composition_root;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Parses and validates `std::env::args()`. The caller is responsible for
/// initializing logging, building the composition root, running the
/// requested command, and mapping the result via [`result_to_exit_code`].
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
