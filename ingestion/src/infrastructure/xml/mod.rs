// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `libxml2`-backed implementation of the XML processor port (C2,
//! `spec.md` §4.2). One library gives us namespace-aware DOM parsing,
//! XPath 1.0 evaluation, and serialization, which is also what lets the
//! schema validator (C3) share the same parsed tree for structural,
//! compatibility, and XSD checks.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use libxml::parser::Parser;
use libxml::tree::{Document, Node};
use libxml::xpath::Context;

use ingestion_domain::entities::RootElement;
use ingestion_domain::error::IngestionError;
use ingestion_domain::services::{ParsedDocument, XmlElement, XmlProcessorService};
use ingestion_domain::value_objects::XPathExpr;

/// Guards every call into libxml2: the C library's per-thread parser state
/// is not safe to drive from multiple Rust threads concurrently, and the
/// worker pool (C8) runs one pipeline per OS thread.
static LIBXML_LOCK: Mutex<()> = Mutex::new(());

/// Wraps a `libxml::tree::Document`/`Node` so it can cross the thread
/// boundary `ParsedDocument`/`XmlElement`'s `Send + Sync` supertrait bound
/// requires. Both types are `Rc`-backed internally, so neither is `Send`
/// or `Sync` on their own - their refcounts are plain, non-atomic counters
/// that are unsound to touch from two threads at once without external
/// synchronization.
///
/// SAFETY: every access to the wrapped value in this module - construction
/// in `parse`, XPath evaluation, cloning for a child `LibxmlElement`,
/// serialization, and this wrapper's own `Drop` (which takes the value out
/// and drops it while still holding the lock, rather than letting the
/// compiler's field drop-glue run it after `drop` returns) - happens while
/// `LIBXML_LOCK` is held. That serializes every touch of libxml2's C state
/// and every `Rc` refcount bump onto one critical section at a time, which
/// is what makes it sound for a `LibxmlHandle` to move between the worker
/// pool's OS threads even though the value it holds cannot.
struct LibxmlHandle<T>(Option<T>);

unsafe impl<T> Send for LibxmlHandle<T> {}
unsafe impl<T> Sync for LibxmlHandle<T> {}

impl<T> LibxmlHandle<T> {
    fn new(value: T) -> Self {
        Self(Some(value))
    }
}

impl<T> std::ops::Deref for LibxmlHandle<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.0.as_ref().expect("libxml handle used after drop")
    }
}

impl<T: Clone> Clone for LibxmlHandle<T> {
    /// Only sound to call while holding `LIBXML_LOCK` - every call site in
    /// this module does, since `Document`/`Node` cloning is itself an `Rc`
    /// refcount bump.
    fn clone(&self) -> Self {
        Self(Some((**self).clone()))
    }
}

impl<T> Drop for LibxmlHandle<T> {
    fn drop(&mut self) {
        let _guard = LIBXML_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        self.0.take();
    }
}

/// A parsed document plus the namespace bindings collected from it at parse
/// time - `spec.md` §4.2: "XPath evaluation must bind every declared
/// namespace of the document."
pub struct LibxmlDocument {
    pub(crate) doc: LibxmlHandle<Document>,
    pub(crate) root_local_name: String,
    pub(crate) root_namespace: Option<String>,
    pub(crate) namespaces: Vec<(String, String)>,
}

impl ParsedDocument for LibxmlDocument {
    fn root(&self) -> RootElement {
        RootElement::parse(&self.root_local_name)
    }

    fn namespace(&self) -> Option<&str> {
        self.root_namespace.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct LibxmlElement {
    local_name: String,
    node: LibxmlHandle<Node>,
    doc: LibxmlHandle<Document>,
}

impl XmlElement for LibxmlElement {
    fn local_name(&self) -> &str {
        &self.local_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct LibxmlProcessorService;

impl LibxmlProcessorService {
    pub fn new() -> Self {
        Self
    }

    fn bind_namespaces(ctx: &mut Context, namespaces: &[(String, String)]) {
        for (prefix, href) in namespaces {
            if prefix.is_empty() {
                continue;
            }
            let _ = ctx.register_namespace(prefix, href);
        }
    }

    fn collect_namespaces(node: &Node, out: &mut HashMap<String, String>) {
        for ns in node.get_namespace_declarations() {
            out.entry(ns.get_prefix()).or_insert_with(|| ns.get_href());
        }
        for child in node.get_child_elements() {
            Self::collect_namespaces(&child, out);
        }
    }

    /// Depth-first search for the `(parent, child-local-name)` pair with the
    /// most repeated children, tracking the running maximum in `best`.
    fn largest_group_under(parent: &Node, best: &mut Option<(usize, String)>) {
        let children = parent.get_child_elements();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for child in &children {
            *counts.entry(child.get_name()).or_insert(0) += 1;
        }
        if let Some((name, count)) = counts.into_iter().max_by_key(|(_, count)| *count) {
            if count > 1 {
                let better = best.as_ref().map(|(best_count, _)| count > *best_count).unwrap_or(true);
                if better {
                    *best = Some((count, format!("//{}/{}", parent.get_name(), name)));
                }
            }
        }
        for child in &children {
            Self::largest_group_under(child, best);
        }
    }
}

#[async_trait]
impl XmlProcessorService for LibxmlProcessorService {
    async fn parse(&self, bytes: &[u8]) -> Result<Box<dyn ParsedDocument>, IngestionError> {
        let _guard = LIBXML_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(IngestionError::Parse("empty document".to_string()));
        }
        let text = std::str::from_utf8(bytes).map_err(|e| IngestionError::Parse(format!("not valid UTF-8: {e}")))?;
        // Secure defaults (`spec.md` §4.2/§6 `xml.validation.enableExternalDtd`
        // `/enableExternalSchema`): `Parser::default()` does not set the
        // libxml2 `NOENT`/`DTDLOAD`/`NONET` options that would make the
        // parser fetch or substitute external entities.
        let parser = Parser::default();
        let doc = parser
            .parse_string(text)
            .map_err(|e| IngestionError::Parse(format!("malformed XML: {e:?}")))?;

        let root = doc
            .get_root_element()
            .ok_or_else(|| IngestionError::Parse("document has no root element".to_string()))?;

        let mut namespaces = HashMap::new();
        Self::collect_namespaces(&root, &mut namespaces);

        Ok(Box::new(LibxmlDocument {
            root_local_name: root.get_name(),
            root_namespace: root.get_namespace().map(|ns| ns.get_href()),
            namespaces: namespaces.into_iter().collect(),
            doc: LibxmlHandle::new(doc),
        }))
    }

    async fn eval_string(&self, document: &dyn ParsedDocument, expr: &XPathExpr) -> Result<Option<String>, IngestionError> {
        let nodes = self.eval_nodes(document, expr).await?;
        Ok(nodes.into_iter().next().map(|n| {
            let n = n.as_any().downcast_ref::<LibxmlElement>().expect("produced by this service");
            n.node.get_content()
        }))
    }

    async fn eval_nodes(
        &self,
        document: &dyn ParsedDocument,
        expr: &XPathExpr,
    ) -> Result<Vec<Box<dyn XmlElement>>, IngestionError> {
        let _guard = LIBXML_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let doc = downcast_document(document)?;
        let mut ctx = Context::new(&doc.doc).map_err(|_| IngestionError::Parse("cannot create xpath context".to_string()))?;
        Self::bind_namespaces(&mut ctx, &doc.namespaces);
        let result = ctx
            .evaluate(expr.as_str())
            .map_err(|_| IngestionError::Transform(format!("invalid xpath expression: {expr}")))?;
        Ok(result
            .get_nodes_as_vec()
            .into_iter()
            .map(|node| {
                let local_name = node.get_name();
                Box::new(LibxmlElement { local_name, node: LibxmlHandle::new(node), doc: doc.doc.clone() }) as Box<dyn XmlElement>
            })
            .collect())
    }

    async fn eval_string_in(&self, element: &dyn XmlElement, expr: &XPathExpr) -> Result<Option<String>, IngestionError> {
        let _guard = LIBXML_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let element = element
            .as_any()
            .downcast_ref::<LibxmlElement>()
            .ok_or_else(|| IngestionError::Transform("element not produced by this xml processor".to_string()))?;
        let mut ctx = Context::new(&element.doc).map_err(|_| IngestionError::Parse("cannot create xpath context".to_string()))?;
        let mut namespaces = HashMap::new();
        LibxmlProcessorService::collect_namespaces(&element.node, &mut namespaces);
        Self::bind_namespaces(&mut ctx, &namespaces.into_iter().collect::<Vec<_>>());
        let result = ctx
            .node_evaluate(expr.as_str(), &element.node)
            .map_err(|_| IngestionError::Transform(format!("invalid xpath expression: {expr}")))?;
        Ok(result.get_nodes_as_vec().into_iter().next().map(|n| n.get_content()))
    }

    fn relative_path(&self, child_xpath: &str, parent_xpath: &str) -> String {
        let child = child_xpath.trim_start_matches('/');
        let parent = parent_xpath.trim_start_matches('/').trim_end_matches('/');
        match child.strip_prefix(parent) {
            Some(rest) => rest.trim_start_matches('/').to_string(),
            None => child.to_string(),
        }
    }

    fn parent_path(&self, xpath: &str) -> String {
        match xpath.trim_end_matches('/').rfind('/') {
            Some(idx) if idx > 0 => xpath[..idx].to_string(),
            _ => String::new(),
        }
    }

    async fn serialize_canonical(&self, document: &dyn ParsedDocument) -> Result<Vec<u8>, IngestionError> {
        let _guard = LIBXML_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let doc = downcast_document(document)?;
        Ok(doc.doc.to_string().into_bytes())
    }

    async fn largest_sibling_group(&self, document: &dyn ParsedDocument) -> Result<Option<String>, IngestionError> {
        let _guard = LIBXML_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let doc = downcast_document(document)?;
        let Some(root) = doc.doc.get_root_element() else {
            return Ok(None);
        };
        let mut best: Option<(usize, String)> = None;
        Self::largest_group_under(&root, &mut best);
        Ok(best.map(|(_, xpath)| xpath))
    }
}

fn downcast_document(document: &dyn ParsedDocument) -> Result<&LibxmlDocument, IngestionError> {
    document
        .as_any()
        .downcast_ref::<LibxmlDocument>()
        .ok_or_else(|| IngestionError::Parse("document not produced by the libxml processor".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_document_is_a_parse_error() {
        let svc = LibxmlProcessorService::new();
        assert!(svc.parse(b"").await.is_err());
        assert!(svc.parse(b"   ").await.is_err());
    }

    #[tokio::test]
    async fn parses_and_evaluates_simple_document() {
        let svc = LibxmlProcessorService::new();
        let doc = svc.parse(b"<ASN><Number>A1</Number></ASN>").await.unwrap();
        assert_eq!(doc.root().local_name(), "ASN");
        let expr = XPathExpr::parse("//Number").unwrap();
        let value = svc.eval_string(doc.as_ref(), &expr).await.unwrap();
        assert_eq!(value.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn missing_match_is_none_not_empty_string() {
        let svc = LibxmlProcessorService::new();
        let doc = svc.parse(b"<ASN/>").await.unwrap();
        let expr = XPathExpr::parse("//Missing").unwrap();
        assert_eq!(svc.eval_string(doc.as_ref(), &expr).await.unwrap(), None);
    }

    #[test]
    fn relative_path_strips_common_parent() {
        let svc = LibxmlProcessorService::new();
        assert_eq!(svc.relative_path("//ASN_LINE/ItemNumber", "//ASN_LINE"), "ItemNumber");
    }

    #[test]
    fn parent_path_drops_last_segment() {
        let svc = LibxmlProcessorService::new();
        assert_eq!(svc.parent_path("/ASN/ASN_LINE/ItemNumber"), "/ASN/ASN_LINE");
    }

    #[tokio::test]
    async fn largest_sibling_group_finds_the_most_repeated_child() {
        let svc = LibxmlProcessorService::new();
        let doc = svc
            .parse(b"<Order><Meta><Note/></Meta><Lines><Line/><Line/><Line/></Lines></Order>")
            .await
            .unwrap();
        assert_eq!(svc.largest_sibling_group(doc.as_ref()).await.unwrap().as_deref(), Some("//Lines/Line"));
    }

    #[tokio::test]
    async fn largest_sibling_group_is_none_without_repeats() {
        let svc = LibxmlProcessorService::new();
        let doc = svc.parse(b"<Order><Number>1</Number></Order>").await.unwrap();
        assert_eq!(svc.largest_sibling_group(doc.as_ref()).await.unwrap(), None);
    }
}
