// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Ingestion domain events and the observer hook C10 uses to report them
//! (`spec.md` §4.10). Correlated by [`ProcessedFileId`] rather than a
//! separate event id — one file produces at most one terminal event.

use chrono::{DateTime, Utc};

use crate::value_objects::{ClientId, HeaderId, InterfaceId, ProcessedFileId};

#[derive(Debug, Clone)]
pub enum IngestionEvent {
    FileAccepted {
        file_id: ProcessedFileId,
        client_id: ClientId,
        interface_id: InterfaceId,
        at: DateTime<Utc>,
    },
    DocumentCommitted {
        file_id: ProcessedFileId,
        header_id: HeaderId,
        line_count: usize,
        at: DateTime<Utc>,
    },
    FileRejected {
        file_id: ProcessedFileId,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl IngestionEvent {
    pub fn file_id(&self) -> ProcessedFileId {
        match self {
            Self::FileAccepted { file_id, .. }
            | Self::DocumentCommitted { file_id, .. }
            | Self::FileRejected { file_id, .. } => *file_id,
        }
    }
}

/// Observer hooks for pipeline progress, mirroring the default-impl pattern
/// so callers only override what they care about.
#[async_trait::async_trait]
pub trait IngestionObserver: Send + Sync {
    async fn on_event(&self, _event: &IngestionEvent) {}
}
