// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! XML parsing and XPath extraction port (C2, `spec.md` §4.2).
//!
//! The domain only sees a parsed, root-matched document (or a node within
//! it); libxml2 bindings, streaming vs. DOM parsing, and namespace
//! resolution are all infrastructure concerns (`ingestion::infrastructure::xml`).

use async_trait::async_trait;

use crate::entities::RootElement;
use crate::error::IngestionError;
use crate::value_objects::XPathExpr;

/// An opaque handle to a parsed XML document, owned by the infrastructure
/// implementation. The domain only moves it around and asks for field
/// extractions by XPath.
pub trait ParsedDocument: Send + Sync {
    /// Root element name and optional namespace, for root-element matching
    /// (`spec.md` §4.2, Interface.root_element).
    fn root(&self) -> RootElement;

    fn namespace(&self) -> Option<&str>;

    /// Lets the infrastructure implementation recover its concrete type from
    /// the trait object - `ParsedDocument` is produced once by `parse` and
    /// then threaded through every later call as `&dyn ParsedDocument`.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// An element context within a parsed document, e.g. one `<ASN_LINE>` node
/// (`spec.md` §4.6 step 6: LINE rules evaluate `source_field` *relative to*
/// the line node, not the document root).
pub trait XmlElement: Send + Sync {
    fn local_name(&self) -> &str;

    fn as_any(&self) -> &dyn std::any::Any;
}

#[async_trait]
pub trait XmlProcessorService: Send + Sync {
    /// Parses `bytes` into a [`ParsedDocument`]. Malformed XML raises
    /// [`IngestionError::Parse`] (`spec.md` §7). Rejects external
    /// entity/DTD references by default (`spec.md` §4.2 secure defaults).
    async fn parse(&self, bytes: &[u8]) -> Result<Box<dyn ParsedDocument>, IngestionError>;

    /// Evaluates `expr` against the whole `document`, returning the first
    /// matched node's text content, in document order. `None` (not `""`)
    /// when nothing matches (`spec.md` §4.2).
    async fn eval_string(&self, document: &dyn ParsedDocument, expr: &XPathExpr) -> Result<Option<String>, IngestionError>;

    /// Evaluates `expr` against `document` and returns every matching
    /// element, in document order.
    async fn eval_nodes(
        &self,
        document: &dyn ParsedDocument,
        expr: &XPathExpr,
    ) -> Result<Vec<Box<dyn XmlElement>>, IngestionError>;

    /// Evaluates `expr` relative to `element` rather than the document root
    /// (`spec.md` §4.6 step 6). `None` when nothing matches.
    async fn eval_string_in(&self, element: &dyn XmlElement, expr: &XPathExpr) -> Result<Option<String>, IngestionError>;

    /// Rewrites `child_xpath` relative to `parent_xpath`, e.g.
    /// `relative_path("//ASN_LINE/ItemNumber", "//ASN_LINE") == "ItemNumber"`.
    fn relative_path(&self, child_xpath: &str, parent_xpath: &str) -> String;

    /// The XPath of `xpath`'s parent location step.
    fn parent_path(&self, xpath: &str) -> String;

    /// Re-serializes `document` into canonical-formatted bytes for
    /// [`crate::entities::ProcessedFile::mark_success`] (DESIGN.md open
    /// question (b)).
    async fn serialize_canonical(&self, document: &dyn ParsedDocument) -> Result<Vec<u8>, IngestionError>;

    /// Last-resort line-node XPath fallback (`spec.md` §4.6 step 5): the
    /// largest group of sibling elements sharing a local name under a
    /// common parent, e.g. `//Order/Lines/Line` when `Line` repeats more
    /// than any other child under `Lines`. `None` when the document has no
    /// element with more than one same-named child.
    async fn largest_sibling_group(&self, document: &dyn ParsedDocument) -> Result<Option<String>, IngestionError>;
}
