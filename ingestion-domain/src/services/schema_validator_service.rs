// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! XSD structural validation port (C3, `spec.md` §4.3).

use async_trait::async_trait;

use crate::error::IngestionError;
use crate::services::xml_processor_service::ParsedDocument;

/// One XSD complaint, kept separate from [`IngestionError`] so a caller can
/// collect every violation before deciding whether to fail the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

#[async_trait]
pub trait SchemaValidatorService: Send + Sync {
    /// Validates `document` against the XSD at `schema_path`. Returns every
    /// violation found; an empty `Vec` means the document is valid.
    ///
    /// When `flexible` is set (`RootElement::is_flexible`), only the
    /// document's structural well-formedness against the schema's element
    /// tree is checked — type and enumeration facets are skipped
    /// (`spec.md` §4.3).
    async fn validate(
        &self,
        document: &dyn ParsedDocument,
        schema_path: &str,
        flexible: bool,
    ) -> Result<Vec<SchemaViolation>, IngestionError>;

    /// Loads and compiles the schema at `schema_path` into the validator's
    /// cache ahead of time, so the first `validate` call for an interface
    /// does not pay parse cost on the critical path.
    async fn warm_schema(&self, schema_path: &str) -> Result<(), IngestionError>;
}
