// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Document line persistence port (C7, `spec.md` §4.7).

use async_trait::async_trait;

use crate::entities::DocumentLine;
use crate::error::IngestionError;
use crate::value_objects::{DocumentLineId, HeaderId};

#[async_trait]
pub trait LineRepository: Send + Sync {
    /// Saves `lines` in chunks of the current batch size (§4.9, C9),
    /// after [`crate::entities::validate_batch`] has already confirmed a
    /// single header/client and no duplicate line numbers. A chunk that
    /// fails rolls back that chunk only — earlier chunks already committed
    /// stay committed.
    async fn create_batch(&self, lines: Vec<DocumentLine>, batch_size: usize) -> Result<Vec<DocumentLine>, IngestionError>;

    async fn find_by_header(&self, header_id: HeaderId) -> Result<Vec<DocumentLine>, IngestionError>;

    async fn delete(&self, id: DocumentLineId) -> Result<(), IngestionError>;

    /// Deletes every line owned by `header_id` (cascade on header delete,
    /// `spec.md` §3 ownership note).
    async fn delete_by_header(&self, header_id: HeaderId) -> Result<(), IngestionError>;
}
