// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Purchase-order document processing strategy.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use ingestion_domain::entities::{DocumentHeader, DocumentLine, Interface, MappingRule, OrderHeader, OrderLine};
use ingestion_domain::error::IngestionError;
use ingestion_domain::services::document_processing_strategy::{DocumentProcessingStrategy, ProcessedDocument};
use ingestion_domain::services::xml_processor_service::{ParsedDocument, XmlProcessorService};
use ingestion_domain::services::TransformationService;
use ingestion_domain::value_objects::TargetLevel;

use super::{apply_header_rule, apply_line_rule, line_node_xpath, rules_for};

pub struct OrderStrategy {
    xml: Arc<dyn XmlProcessorService>,
    transform: Arc<dyn TransformationService>,
}

impl OrderStrategy {
    pub fn new(xml: Arc<dyn XmlProcessorService>, transform: Arc<dyn TransformationService>) -> Self {
        Self { xml, transform }
    }
}

#[async_trait]
impl DocumentProcessingStrategy for OrderStrategy {
    async fn process(
        &self,
        document: &dyn ParsedDocument,
        interface: &Interface,
        rules: &[MappingRule],
    ) -> Result<ProcessedDocument, IngestionError> {
        let header_rules = rules_for(rules, TargetLevel::Header, "ORDER_HEADERS");
        let line_rules = rules_for(rules, TargetLevel::Line, "ORDER_LINES");

        let mut header = OrderHeader::new_default(interface.client_id(), interface.id());
        for rule in &header_rules {
            apply_header_rule(self.xml.as_ref(), self.transform.as_ref(), document, rule, OrderHeader::FIELDS, &mut header).await?;
        }

        let line_xpath = line_node_xpath(self.xml.as_ref(), document, &line_rules, self.default_line_xpath()).await?;
        let line_xpath_expr = ingestion_domain::value_objects::XPathExpr::parse(&line_xpath)?;
        let line_nodes = self.xml.eval_nodes(document, &line_xpath_expr).await?;

        let mut lines = Vec::with_capacity(line_nodes.len());
        for (idx, node) in line_nodes.iter().enumerate() {
            let line_number = idx as i64 + 1;
            let mut line = OrderLine::new_default(header.id, header.client_id, line_number);
            for rule in &line_rules {
                if let Err(err) = apply_line_rule(self.xml.as_ref(), self.transform.as_ref(), node.as_ref(), &line_xpath, rule, OrderLine::FIELDS, &mut line).await {
                    warn!(line_number, rule = rule.name(), error = %err, "required order line rule failed, aborting document");
                    return Err(err);
                }
            }
            lines.push(DocumentLine::Order(line));
        }

        Ok(ProcessedDocument {
            header: DocumentHeader::Order(header),
            lines,
        })
    }

    fn default_line_xpath(&self) -> &str {
        "//OrderLine"
    }

    fn document_type(&self) -> &str {
        "ORDER"
    }

    fn priority(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingestion_domain::value_objects::{ClientId, DataType, DocumentType, InterfaceId};

    #[tokio::test]
    async fn builds_header_and_lines() {
        use crate::infrastructure::transform::StringTransformationService;
        use crate::infrastructure::xml::LibxmlProcessorService;

        let xml: Arc<dyn XmlProcessorService> = Arc::new(LibxmlProcessorService::new());
        let transform: Arc<dyn TransformationService> = Arc::new(StringTransformationService::new());
        let strategy = OrderStrategy::new(xml.clone(), transform);

        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-order", DocumentType::new("ORDER"), "Order", None, "/schemas/order.xsd", 0);

        let rules = vec![
            MappingRule::new(client, iface_id, "order_number", "/Order/OrderNumber", "order_number", TargetLevel::Header, "ORDER_HEADERS", DataType::String, 1)
                .unwrap()
                .required(true),
            MappingRule::new(client, iface_id, "sku", "/Order/OrderLine/Sku", "sku", TargetLevel::Line, "ORDER_LINES", DataType::String, 1)
                .unwrap()
                .required(true),
        ];

        let doc = xml
            .parse(b"<Order><OrderNumber>PO-9</OrderNumber><OrderLine><Sku>ABC</Sku></OrderLine></Order>")
            .await
            .unwrap();

        let processed = strategy.process(doc.as_ref(), &interface, &rules).await.unwrap();
        assert_eq!(processed.lines.len(), 1);
        match &processed.lines[0] {
            DocumentLine::Order(l) => assert_eq!(l.sku.as_deref(), Some("ABC")),
            _ => panic!("expected order line"),
        }
    }
}
