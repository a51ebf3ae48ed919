// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ProcessedFile` (`spec.md` §3): the ingestion ledger row for one inbound
//! message. Created `PROCESSING` at pipeline entry, transitions exactly once
//! to `SUCCESS` or `ERROR`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestionError;
use crate::value_objects::{ClientId, InterfaceId, ProcessedFileId, ProcessedFileStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFile {
    id: ProcessedFileId,
    file_name: String,
    client_id: ClientId,
    interface_id: InterfaceId,
    status: ProcessedFileStatus,
    error_message: Option<String>,
    content: Option<Vec<u8>>,
    processed_at: Option<DateTime<Utc>>,
}

impl ProcessedFile {
    pub fn new(file_name: impl Into<String>, client_id: ClientId, interface_id: InterfaceId) -> Self {
        Self {
            id: ProcessedFileId::new(),
            file_name: file_name.into(),
            client_id,
            interface_id,
            status: ProcessedFileStatus::Processing,
            error_message: None,
            content: None,
            processed_at: None,
        }
    }

    /// Reconstitutes a row already persisted by a repository. Bypasses the
    /// single-transition invariant enforced by [`Self::mark_success`]/
    /// [`Self::mark_error`] since the row may already be terminal.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ProcessedFileId,
        file_name: String,
        client_id: ClientId,
        interface_id: InterfaceId,
        status: ProcessedFileStatus,
        error_message: Option<String>,
        content: Option<Vec<u8>>,
        processed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            file_name,
            client_id,
            interface_id,
            status,
            error_message,
            content,
            processed_at,
        }
    }

    pub fn id(&self) -> ProcessedFileId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.interface_id
    }

    pub fn status(&self) -> ProcessedFileStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Transitions to `SUCCESS`, storing the canonical content (open
    /// question (b) in DESIGN.md). Fails if the row already reached a
    /// terminal status — a `ProcessedFile` transitions exactly once.
    pub fn mark_success(&mut self, canonical_content: Vec<u8>, now: DateTime<Utc>) -> Result<(), IngestionError> {
        self.transition_to_terminal(now)?;
        self.status = ProcessedFileStatus::Success;
        self.content = Some(canonical_content);
        self.error_message = None;
        Ok(())
    }

    /// Transitions to `ERROR` with a `"{kind}: {detail}"` message
    /// (`spec.md` §7).
    pub fn mark_error(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), IngestionError> {
        self.transition_to_terminal(now)?;
        self.status = ProcessedFileStatus::Error;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn transition_to_terminal(&self, _now: DateTime<Utc>) -> Result<(), IngestionError> {
        if self.status.is_terminal() {
            return Err(IngestionError::validation(
                "processed_file.status",
                format!("already terminal ({:?})", self.status),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_exactly_once() {
        let mut file = ProcessedFile::new("a.xml", ClientId::new(), InterfaceId::new());
        let now = Utc::now();
        assert!(file.mark_success(b"<a/>".to_vec(), now).is_ok());
        assert!(matches!(file.status(), ProcessedFileStatus::Success));
        assert!(file.mark_error("boom", now).is_err());
    }
}
