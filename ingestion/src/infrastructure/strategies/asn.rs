// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! ASN (Advance Shipping Notice) document processing strategy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use ingestion_domain::entities::{AsnHeader, AsnLine, DocumentHeader, DocumentLine, Interface, MappingRule};
use ingestion_domain::error::IngestionError;
use ingestion_domain::services::document_processing_strategy::{DocumentProcessingStrategy, ProcessedDocument};
use ingestion_domain::services::xml_processor_service::{ParsedDocument, XmlProcessorService};
use ingestion_domain::services::TransformationService;
use ingestion_domain::value_objects::TargetLevel;

use super::{apply_header_rule, apply_line_rule, line_node_xpath, rules_for};

pub struct AsnStrategy {
    xml: Arc<dyn XmlProcessorService>,
    transform: Arc<dyn TransformationService>,
}

impl AsnStrategy {
    pub fn new(xml: Arc<dyn XmlProcessorService>, transform: Arc<dyn TransformationService>) -> Self {
        Self { xml, transform }
    }
}

#[async_trait]
impl DocumentProcessingStrategy for AsnStrategy {
    async fn process(
        &self,
        document: &dyn ParsedDocument,
        interface: &Interface,
        rules: &[MappingRule],
    ) -> Result<ProcessedDocument, IngestionError> {
        let header_rules = rules_for(rules, TargetLevel::Header, "ASN_HEADERS");
        let line_rules = rules_for(rules, TargetLevel::Line, "ASN_LINES");

        let mut header = AsnHeader::new_default(interface.client_id(), interface.id());
        for rule in &header_rules {
            apply_header_rule(self.xml.as_ref(), self.transform.as_ref(), document, rule, AsnHeader::FIELDS, &mut header).await?;
        }

        let line_xpath = line_node_xpath(self.xml.as_ref(), document, &line_rules, self.default_line_xpath()).await?;
        let line_xpath_expr = ingestion_domain::value_objects::XPathExpr::parse(&line_xpath)?;
        let line_nodes = self.xml.eval_nodes(document, &line_xpath_expr).await?;

        let mut lines = Vec::with_capacity(line_nodes.len());
        for (idx, node) in line_nodes.iter().enumerate() {
            let line_number = idx as i64 + 1;
            let mut line = AsnLine::new_default(header.id, header.client_id, line_number);
            for rule in &line_rules {
                if let Err(err) = apply_line_rule(self.xml.as_ref(), self.transform.as_ref(), node.as_ref(), &line_xpath, rule, AsnLine::FIELDS, &mut line).await {
                    warn!(line_number, rule = rule.name(), error = %err, "required ASN line rule failed, aborting document");
                    return Err(err);
                }
            }
            lines.push(DocumentLine::Asn(line));
        }

        Ok(ProcessedDocument {
            header: DocumentHeader::Asn(header),
            lines,
        })
    }

    fn default_line_xpath(&self) -> &str {
        "//ASN_LINE"
    }

    fn document_type(&self) -> &str {
        "ASN"
    }

    fn priority(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion_domain::value_objects::{ClientId, DataType, DocumentType, InterfaceId};

    fn rule(client: ClientId, iface: InterfaceId, source: &str, target: &str, level: TargetLevel, table: &str, required: bool, priority: i32) -> MappingRule {
        MappingRule::new(client, iface, target, source, target, level, table, DataType::String, priority)
            .unwrap()
            .required(required)
    }

    #[tokio::test]
    async fn builds_header_from_required_rules() {
        use crate::infrastructure::transform::StringTransformationService;
        use crate::infrastructure::xml::LibxmlProcessorService;

        let xml: Arc<dyn XmlProcessorService> = Arc::new(LibxmlProcessorService::new());
        let transform: Arc<dyn TransformationService> = Arc::new(StringTransformationService::new());
        let strategy = AsnStrategy::new(xml.clone(), transform);

        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);

        let rules = vec![rule(client, iface_id, "/ASN/AsnNumber", "asn_number", TargetLevel::Header, "ASN_HEADERS", true, 1)];

        let doc = xml
            .parse(b"<ASN><AsnNumber>ASN-1</AsnNumber><ASN_LINE><ItemNumber>I-1</ItemNumber></ASN_LINE></ASN>")
            .await
            .unwrap();

        let processed = strategy.process(doc.as_ref(), &interface, &rules).await.unwrap();
        match processed.header {
            DocumentHeader::Asn(h) => assert_eq!(h.asn_number, "ASN-1"),
            _ => panic!("expected asn header"),
        }
    }

    #[tokio::test]
    async fn missing_required_header_field_is_an_error() {
        use crate::infrastructure::transform::StringTransformationService;
        use crate::infrastructure::xml::LibxmlProcessorService;

        let xml: Arc<dyn XmlProcessorService> = Arc::new(LibxmlProcessorService::new());
        let transform: Arc<dyn TransformationService> = Arc::new(StringTransformationService::new());
        let strategy = AsnStrategy::new(xml.clone(), transform);

        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);
        let rules = vec![rule(client, iface_id, "/ASN/AsnNumber", "asn_number", TargetLevel::Header, "ASN_HEADERS", true, 1)];

        let doc = xml.parse(b"<ASN></ASN>").await.unwrap();
        assert!(strategy.process(doc.as_ref(), &interface, &rules).await.is_err());
    }

    #[tokio::test]
    async fn required_line_field_missing_on_any_line_aborts_the_whole_document() {
        use crate::infrastructure::transform::StringTransformationService;
        use crate::infrastructure::xml::LibxmlProcessorService;

        let xml: Arc<dyn XmlProcessorService> = Arc::new(LibxmlProcessorService::new());
        let transform: Arc<dyn TransformationService> = Arc::new(StringTransformationService::new());
        let strategy = AsnStrategy::new(xml.clone(), transform);

        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);

        let rules = vec![
            rule(client, iface_id, "/ASN/AsnNumber", "asn_number", TargetLevel::Header, "ASN_HEADERS", true, 1),
            rule(client, iface_id, "ItemNumber", "item_number", TargetLevel::Line, "ASN_LINES", true, 1),
        ];

        // Third ASN_LINE has no ItemNumber; a required-rule failure on any
        // single line must abort the whole document, not just that line.
        let doc = xml
            .parse(
                b"<ASN><AsnNumber>ASN-1</AsnNumber>\
                  <ASN_LINE><ItemNumber>I-1</ItemNumber></ASN_LINE>\
                  <ASN_LINE><ItemNumber>I-2</ItemNumber></ASN_LINE>\
                  <ASN_LINE></ASN_LINE></ASN>",
            )
            .await
            .unwrap();

        assert!(strategy.process(doc.as_ref(), &interface, &rules).await.is_err());
    }
}
