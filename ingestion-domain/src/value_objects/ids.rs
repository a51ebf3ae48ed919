// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete entity identifiers, each a distinct `GenericId` specialization so
//! a `ClientId` can never be passed where an `InterfaceId` is expected.

use serde::{Deserialize, Serialize};

use super::generic_id::{GenericId, IdCategory};

macro_rules! entity_id {
    ($name:ident, $marker:ident, $category:expr) => {
        #[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        pub struct $name(GenericId<$marker>);

        #[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        struct $marker;

        impl IdCategory for $marker {
            fn category_name() -> &'static str {
                $category
            }
        }

        impl $name {
            pub fn new() -> Self {
                Self(GenericId::new())
            }

            pub fn parse(s: &str) -> Result<Self, crate::error::IngestionError> {
                Ok(Self(GenericId::parse(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(ClientId, ClientMarker, "client");
entity_id!(InterfaceId, InterfaceMarker, "interface");
entity_id!(MappingRuleId, MappingRuleMarker, "mapping_rule");
entity_id!(HeaderId, HeaderMarker, "document_header");
entity_id!(DocumentLineId, DocumentLineMarker, "document_line");
entity_id!(ProcessedFileId, ProcessedFileMarker, "processed_file");
