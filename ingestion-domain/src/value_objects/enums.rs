// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Small closed enumerations from the data model (`spec.md` §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProcessedFileStatus {
    Processing,
    Success,
    Error,
}

impl ProcessedFileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// Priority of an inbound message envelope; also the routing key suffix
/// bound to the three durable queues in `spec.md` §4.8/§6.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn routing_key(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Priorities in drain order: high before normal before low.
    pub const ALL_BY_DRAIN_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];
}

/// Which entity level a `MappingRule` contributes to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum TargetLevel {
    Header,
    Line,
}

/// The document type an `Interface` describes; also the strategy-factory key.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DocumentType(String);

impl DocumentType {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
