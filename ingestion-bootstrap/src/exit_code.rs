// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Process exit codes. Follows the BSD `sysexits.h` convention the teacher's
//! CLI already used, mapped from [`IngestionError::category`] rather than
//! re-deriving a second taxonomy.

use ingestion_domain::error::IngestionError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    /// Generic failure with no more specific `sysexits.h` code.
    Failure = 1,
    /// `EX_USAGE` - bad CLI arguments.
    Usage = 64,
    /// `EX_DATAERR` - malformed input (parse/validation/transform failures).
    DataErr = 65,
    /// `EX_UNAVAILABLE` - a dependency is down (circuit open, timeout).
    Unavailable = 69,
    /// `EX_CONFIG` - missing/invalid configuration.
    Config = 78,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

pub fn map_error_to_exit_code(err: &IngestionError) -> ExitCode {
    match err {
        IngestionError::Parse(_) | IngestionError::Validation { .. } | IngestionError::Transform(_) => ExitCode::DataErr,
        IngestionError::Configuration(_) => ExitCode::Config,
        IngestionError::CircuitOpen(_) | IngestionError::Timeout(_) => ExitCode::Unavailable,
        IngestionError::Persistence(_) | IngestionError::Interrupted(_) => ExitCode::Failure,
    }
}

pub fn result_to_exit_code<T>(result: Result<T, IngestionError>) -> std::process::ExitCode {
    match result {
        Ok(_) => ExitCode::Ok.into(),
        Err(err) => {
            tracing::error!(error = %err, category = err.category(), "fatal error");
            map_error_to_exit_code(&err).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_map_to_dataerr() {
        assert_eq!(map_error_to_exit_code(&IngestionError::Parse("bad".into())), ExitCode::DataErr);
    }

    #[test]
    fn circuit_open_maps_to_unavailable() {
        assert_eq!(map_error_to_exit_code(&IngestionError::CircuitOpen("repository".into())), ExitCode::Unavailable);
    }

    #[test]
    fn configuration_maps_to_config() {
        assert_eq!(map_error_to_exit_code(&IngestionError::configuration("missing xsd")), ExitCode::Config);
    }
}
