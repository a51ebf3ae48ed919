// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Taxonomy
//!
//! A single, hierarchical error type shared by every layer of the ingestion
//! pipeline. Each variant is a specific failure mode from the processing
//! taxonomy: parse, validation, configuration, transform, persistence,
//! circuit-open, timeout, and interruption.
//!
//! ## Design
//!
//! - **Specific**: one variant per failure mode, not a grab-bag `Other(String)`
//! - **Categorized**: [`IngestionError::category`] groups variants for metrics
//! - **Recoverable**: [`IngestionError::is_recoverable`] drives the retry
//!   policy in the resilience layer
//! - **Composable**: `{kind}: {detail}` formatting is exactly what the
//!   orchestrator writes into `ProcessedFile.error_message`

use thiserror::Error;

/// Domain-wide error type for the ingestion pipeline.
#[derive(Error, Debug, Clone)]
pub enum IngestionError {
    #[error("ParseError: {0}")]
    Parse(String),

    #[error("ValidationError: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("ConfigurationError: {0}")]
    Configuration(String),

    #[error("TransformError: {0}")]
    Transform(String),

    #[error("PersistenceError: {0}")]
    Persistence(String),

    #[error("CircuitOpen: dependency '{0}' is open")]
    CircuitOpen(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Interrupted: {0}")]
    Interrupted(String),
}

impl IngestionError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Whether a transient retry is worth attempting before counting this
    /// failure against a circuit breaker's sliding window.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Persistence(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Validation { .. } => "validation",
            Self::Configuration(_) => "configuration",
            Self::Transform(_) => "transform",
            Self::Persistence(_) => "persistence",
            Self::CircuitOpen(_) => "circuit_open",
            Self::Timeout(_) => "timeout",
            Self::Interrupted(_) => "interrupted",
        }
    }
}

impl From<std::io::Error> for IngestionError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for IngestionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transform(format!("serialization failed: {err}"))
    }
}
