// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain service ports (`spec.md` §4): traits implemented by the
//! `ingestion` crate's infrastructure layer. The domain depends only on
//! these interfaces, never on a concrete XML library, message bus, or
//! database driver.

pub mod document_processing_strategy;
pub mod resilience_service;
pub mod schema_validator_service;
pub mod transformation_service;
pub mod xml_processor_service;

pub use document_processing_strategy::{DocumentProcessingStrategy, ProcessedDocument, StrategyFactory};
pub use resilience_service::{BreakerConfig, BreakerState, ResilienceService};
pub use schema_validator_service::{SchemaValidatorService, SchemaViolation};
pub use transformation_service::{CoercedValue, TransformationService};
pub use xml_processor_service::{ParsedDocument, XmlElement, XmlProcessorService};
