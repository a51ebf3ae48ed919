// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Document header persistence port (C7, `spec.md` §4.7).

use async_trait::async_trait;

use crate::entities::DocumentHeader;
use crate::error::IngestionError;
use crate::value_objects::{ClientId, HeaderId};

#[async_trait]
pub trait HeaderRepository: Send + Sync {
    /// Validates presence of `client_id` and a non-empty business key, then
    /// inserts. On breaker-open (C4 fallback) the caller receives back a
    /// copy of `header` with `status = "ERROR - Circuit breaker open"`
    /// instead of this method being invoked at all — this trait itself
    /// always persists or fails.
    async fn create(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError>;

    async fn update(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError>;

    async fn delete(&self, id: HeaderId) -> Result<(), IngestionError>;

    async fn find_by_id(&self, id: HeaderId) -> Result<Option<DocumentHeader>, IngestionError>;

    /// Page of headers for `client_id`, most recent first.
    async fn find_by_client(
        &self,
        client_id: ClientId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<DocumentHeader>, IngestionError>;
}
