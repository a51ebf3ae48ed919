// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `HashMap`-keyed [`StrategyFactory`] (`spec.md` §4.6, §9): no strategy
//! class hierarchy, just a lookup table keyed by uppercase document type.

use std::collections::HashMap;
use std::sync::Arc;

use ingestion_domain::services::document_processing_strategy::{DocumentProcessingStrategy, StrategyFactory};

pub struct HashMapStrategyFactory {
    strategies: HashMap<String, Arc<dyn DocumentProcessingStrategy>>,
    default: Arc<dyn DocumentProcessingStrategy>,
}

impl HashMapStrategyFactory {
    /// `default_strategy` handles any document type with no registered
    /// strategy, rather than failing the whole interface lookup.
    pub fn new(default_strategy: Arc<dyn DocumentProcessingStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            default: default_strategy,
        }
    }
}

impl StrategyFactory for HashMapStrategyFactory {
    fn for_document_type(&self, document_type: &str) -> Arc<dyn DocumentProcessingStrategy> {
        self.strategies
            .get(document_type.to_uppercase().as_str())
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    fn register(&mut self, strategy: Arc<dyn DocumentProcessingStrategy>) {
        self.strategies.insert(strategy.document_type().to_uppercase(), strategy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::strategies::{AsnStrategy, OrderStrategy};
    use crate::infrastructure::transform::StringTransformationService;
    use crate::infrastructure::xml::LibxmlProcessorService;

    fn strategies() -> (Arc<dyn DocumentProcessingStrategy>, Arc<dyn DocumentProcessingStrategy>) {
        let xml = Arc::new(LibxmlProcessorService::new());
        let transform = Arc::new(StringTransformationService::new());
        (
            Arc::new(AsnStrategy::new(xml.clone(), transform.clone())),
            Arc::new(OrderStrategy::new(xml, transform)),
        )
    }

    #[test]
    fn resolves_by_uppercase_document_type() {
        let (asn, order) = strategies();
        let mut factory = HashMapStrategyFactory::new(asn.clone());
        factory.register(asn.clone());
        factory.register(order.clone());

        assert_eq!(factory.for_document_type("order").document_type(), "ORDER");
        assert_eq!(factory.for_document_type("ASN").document_type(), "ASN");
    }

    #[test]
    fn unknown_document_type_resolves_to_default() {
        let (asn, _order) = strategies();
        let factory = HashMapStrategyFactory::new(asn);
        assert_eq!(factory.for_document_type("UNKNOWN").document_type(), "ASN");
    }
}
