// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Document processing strategy port (C6, `spec.md` §4.6): one implementation
//! per document type, selected through a [`StrategyFactory`] keyed on the
//! uppercase type name. No inheritance hierarchy — dispatch is a `HashMap`
//! lookup, per the design note in `spec.md` §9.

use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::{DocumentHeader, DocumentLine, Interface, MappingRule};
use crate::error::IngestionError;
use crate::services::xml_processor_service::ParsedDocument;

/// Result of [`DocumentProcessingStrategy::process`]: a header plus the
/// lines that belong under it, still unpersisted. `spec.md` §4.6 invariant:
/// every line here already satisfies `line.client == header.client &&
/// line.header == header` — the strategy never hands back an inconsistent
/// batch.
pub struct ProcessedDocument {
    pub header: DocumentHeader,
    pub lines: Vec<DocumentLine>,
}

#[async_trait]
pub trait DocumentProcessingStrategy: Send + Sync {
    /// Builds a header and its lines from `document`, applying `rules`
    /// (already partitioned by the caller is not required — the strategy
    /// partitions by `target_level` itself) in priority order. Required
    /// fields left null after transformation raise
    /// [`IngestionError::Validation`]; the strategy must never return a
    /// header whose required lines failed.
    async fn process(
        &self,
        document: &dyn ParsedDocument,
        interface: &Interface,
        rules: &[MappingRule],
    ) -> Result<ProcessedDocument, IngestionError>;

    /// Default line-node XPath used when no LINE rule's common parent can
    /// be determined (`spec.md` §4.6 step 5), e.g. `//ASN_LINE`.
    fn default_line_xpath(&self) -> &str;

    /// Uppercase document type this strategy handles, e.g. `"ASN"`.
    fn document_type(&self) -> &str;

    /// Selection priority when more than one strategy could claim a
    /// document (lower runs first).
    fn priority(&self) -> i32;
}

/// Keyed by uppercase document type (`spec.md` §4.6). Unknown types resolve
/// to a configured default strategy rather than failing outright.
pub trait StrategyFactory: Send + Sync {
    fn for_document_type(&self, document_type: &str) -> Arc<dyn DocumentProcessingStrategy>;

    /// Registers `strategy` under its own [`DocumentProcessingStrategy::document_type`].
    fn register(&mut self, strategy: Arc<dyn DocumentProcessingStrategy>);
}
