// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `DocumentLine` (`spec.md` §3): a repeating line item owned by one
//! `DocumentHeader`. Invariants enforced here and by the aggregate in
//! `crate::aggregates::document_aggregate`:
//! `header_id.client_id == client_id`; a line exists only while its header
//! exists; a batch submitted together must share one header and one client.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::entities::field_descriptor::FieldDescriptor;
use crate::error::IngestionError;
use crate::value_objects::{ClientId, DataType, DocumentLineId, HeaderId};

fn parse_field<T: std::str::FromStr>(field: &'static str, value: Option<String>) -> Result<Option<T>, IngestionError> {
    match value {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| IngestionError::validation(field, format!("cannot coerce '{s}'"))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsnLine {
    pub id: DocumentLineId,
    pub header_id: HeaderId,
    pub client_id: ClientId,
    pub line_number: i64,
    pub item_number: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_of_measure: Option<String>,
    pub lot_number: Option<String>,
}

impl AsnLine {
    pub fn new_default(header_id: HeaderId, client_id: ClientId, line_number: i64) -> Self {
        Self {
            id: DocumentLineId::new(),
            header_id,
            client_id,
            line_number,
            item_number: None,
            quantity: None,
            unit_of_measure: None,
            lot_number: None,
        }
    }

    pub const FIELDS: &'static [FieldDescriptor<AsnLine>] = &[
        FieldDescriptor {
            field_name: "item_number",
            data_type: DataType::String,
            nullable: true,
            set: |l, v| {
                l.item_number = v;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "quantity",
            data_type: DataType::BigDecimal,
            nullable: true,
            set: |l, v| {
                l.quantity = parse_field("quantity", v)?;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "unit_of_measure",
            data_type: DataType::String,
            nullable: true,
            set: |l, v| {
                l.unit_of_measure = v;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "lot_number",
            data_type: DataType::String,
            nullable: true,
            set: |l, v| {
                l.lot_number = v;
                Ok(())
            },
        },
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: DocumentLineId,
    pub header_id: HeaderId,
    pub client_id: ClientId,
    pub line_number: i64,
    pub sku: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
}

impl OrderLine {
    pub fn new_default(header_id: HeaderId, client_id: ClientId, line_number: i64) -> Self {
        Self {
            id: DocumentLineId::new(),
            header_id,
            client_id,
            line_number,
            sku: None,
            quantity: None,
            unit_price: None,
        }
    }

    pub const FIELDS: &'static [FieldDescriptor<OrderLine>] = &[
        FieldDescriptor {
            field_name: "sku",
            data_type: DataType::String,
            nullable: true,
            set: |l, v| {
                l.sku = v;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "quantity",
            data_type: DataType::BigDecimal,
            nullable: true,
            set: |l, v| {
                l.quantity = parse_field("quantity", v)?;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "unit_price",
            data_type: DataType::BigDecimal,
            nullable: true,
            set: |l, v| {
                l.unit_price = parse_field("unit_price", v)?;
                Ok(())
            },
        },
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocumentLine {
    Asn(AsnLine),
    Order(OrderLine),
}

impl DocumentLine {
    pub fn header_id(&self) -> HeaderId {
        match self {
            Self::Asn(l) => l.header_id,
            Self::Order(l) => l.header_id,
        }
    }

    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Asn(l) => l.client_id,
            Self::Order(l) => l.client_id,
        }
    }

    pub fn line_number(&self) -> i64 {
        match self {
            Self::Asn(l) => l.line_number,
            Self::Order(l) => l.line_number,
        }
    }
}

/// Validates the invariants of a batch of lines intended for one
/// `create_lines` call (`spec.md` §4.7, property 3 in §8): all lines share
/// one header and one client, and no two lines repeat a line number.
pub fn validate_batch(lines: &[DocumentLine]) -> Result<(), IngestionError> {
    if lines.is_empty() {
        return Err(IngestionError::validation("lines", "batch is empty"));
    }
    let header_id = lines[0].header_id();
    let client_id = lines[0].client_id();
    let mut seen_line_numbers = std::collections::HashSet::new();
    for line in lines {
        if line.header_id() != header_id {
            return Err(IngestionError::validation("lines", "batch spans more than one header"));
        }
        if line.client_id() != client_id {
            return Err(IngestionError::validation("lines", "batch spans more than one client"));
        }
        if !seen_line_numbers.insert(line.line_number()) {
            return Err(IngestionError::validation(
                "lines",
                format!("duplicate line_number {}", line.line_number()),
            ));
        }
    }
    Ok(())
}
