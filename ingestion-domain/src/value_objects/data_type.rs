// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Target scalar types a mapping rule or field descriptor can coerce into
//! (`spec.md` §4.1's `transform_and_convert` coercion table).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Long,
    Double,
    BigDecimal,
    Date,
    DateTime,
    Boolean,
}

impl DataType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "integer" | "int" => Self::Integer,
            "long" => Self::Long,
            "double" | "float" => Self::Double,
            "bigdecimal" | "decimal" => Self::BigDecimal,
            "date" | "localdate" => Self::Date,
            "datetime" | "timestamp" => Self::DateTime,
            "boolean" | "bool" => Self::Boolean,
            _ => Self::String,
        }
    }

    pub fn is_nullable_by_default(self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Inverse of [`Self::parse`], for persisting `MAPPING_RULES.data_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::BigDecimal => "bigdecimal",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
        }
    }
}
