// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Ingestion ledger persistence port (C7, `spec.md` §4.7, §3).

use async_trait::async_trait;

use crate::entities::ProcessedFile;
use crate::error::IngestionError;
use crate::value_objects::{InterfaceId, ProcessedFileId};

/// Atomic field updates applied to a `ProcessedFile` row; `None` fields are
/// left untouched (`spec.md` §4.7 `update_processed_file(id, fields)`).
#[derive(Debug, Clone, Default)]
pub struct ProcessedFileUpdate {
    pub status: Option<crate::value_objects::ProcessedFileStatus>,
    pub error_message: Option<String>,
    pub content: Option<Vec<u8>>,
}

#[async_trait]
pub trait ProcessedFileRepository: Send + Sync {
    async fn create(&self, file: ProcessedFile) -> Result<ProcessedFile, IngestionError>;

    async fn update(&self, id: ProcessedFileId, fields: ProcessedFileUpdate) -> Result<ProcessedFile, IngestionError>;

    /// Most-recent row for `(file_name, interface_id)`, used for the
    /// idempotency check at pipeline entry (`spec.md` §3, §8 S5).
    async fn find_latest(
        &self,
        file_name: &str,
        interface_id: InterfaceId,
    ) -> Result<Option<ProcessedFile>, IngestionError>;
}
