// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `DocumentHeader` (`spec.md` §3): one ASN or ORDER variant per processed
//! document. `(business_key, client_id)` is unique per variant's table.
//!
//! Each variant carries a `const` [`FieldDescriptor`] table consulted by the
//! mapping engine (C6) instead of reflection (`spec.md` §9).

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::entities::field_descriptor::FieldDescriptor;
use crate::error::IngestionError;
use crate::value_objects::{ClientId, DataType, HeaderId, InterfaceId};

fn parse_field<T: FromStr>(field: &'static str, value: Option<String>) -> Result<Option<T>, IngestionError> {
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

/// ASN (Advance Shipping Notice) header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsnHeader {
    pub id: HeaderId,
    pub client_id: ClientId,
    pub interface_id: InterfaceId,
    pub asn_number: String,
    pub status: String,
    pub ship_date: Option<NaiveDate>,
    pub carrier: Option<String>,
    pub supplier_code: Option<String>,
    pub total_weight: Option<BigDecimal>,
}

impl AsnHeader {
    pub fn new_default(client_id: ClientId, interface_id: InterfaceId) -> Self {
        Self {
            id: HeaderId::new(),
            client_id,
            interface_id,
            asn_number: String::new(),
            status: "RECEIVED".to_string(),
            ship_date: None,
            carrier: None,
            supplier_code: None,
            total_weight: None,
        }
    }

    pub fn business_key(&self) -> &str {
        &self.asn_number
    }

    pub const FIELDS: &'static [FieldDescriptor<AsnHeader>] = &[
        FieldDescriptor {
            field_name: "asn_number",
            data_type: DataType::String,
            nullable: false,
            set: |h, v| {
                h.asn_number = v.unwrap_or_default();
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "status",
            data_type: DataType::String,
            nullable: false,
            set: |h, v| {
                if let Some(s) = v {
                    h.status = s;
                }
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "ship_date",
            data_type: DataType::Date,
            nullable: true,
            set: |h, v| {
                h.ship_date = parse_field("ship_date", v)?;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "carrier",
            data_type: DataType::String,
            nullable: true,
            set: |h, v| {
                h.carrier = v;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "supplier_code",
            data_type: DataType::String,
            nullable: true,
            set: |h, v| {
                h.supplier_code = v;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "total_weight",
            data_type: DataType::BigDecimal,
            nullable: true,
            set: |h, v| {
                h.total_weight = parse_field("total_weight", v)?;
                Ok(())
            },
        },
    ];
}

/// Purchase-order header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHeader {
    pub id: HeaderId,
    pub client_id: ClientId,
    pub interface_id: InterfaceId,
    pub order_number: String,
    pub status: String,
    pub order_date: Option<NaiveDate>,
    pub customer_po: Option<String>,
    pub total_amount: Option<BigDecimal>,
}

impl OrderHeader {
    pub fn new_default(client_id: ClientId, interface_id: InterfaceId) -> Self {
        Self {
            id: HeaderId::new(),
            client_id,
            interface_id,
            order_number: String::new(),
            status: "RECEIVED".to_string(),
            order_date: None,
            customer_po: None,
            total_amount: None,
        }
    }

    pub fn business_key(&self) -> &str {
        &self.order_number
    }

    pub const FIELDS: &'static [FieldDescriptor<OrderHeader>] = &[
        FieldDescriptor {
            field_name: "order_number",
            data_type: DataType::String,
            nullable: false,
            set: |h, v| {
                h.order_number = v.unwrap_or_default();
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "status",
            data_type: DataType::String,
            nullable: false,
            set: |h, v| {
                if let Some(s) = v {
                    h.status = s;
                }
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "order_date",
            data_type: DataType::Date,
            nullable: true,
            set: |h, v| {
                h.order_date = parse_field("order_date", v)?;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "customer_po",
            data_type: DataType::String,
            nullable: true,
            set: |h, v| {
                h.customer_po = v;
                Ok(())
            },
        },
        FieldDescriptor {
            field_name: "total_amount",
            data_type: DataType::BigDecimal,
            nullable: true,
            set: |h, v| {
                h.total_amount = parse_field("total_amount", v)?;
                Ok(())
            },
        },
    ];
}

/// The document type-erased view the orchestrator and persistence services
/// operate on after a strategy has decided which concrete variant applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocumentHeader {
    Asn(AsnHeader),
    Order(OrderHeader),
}

impl DocumentHeader {
    pub fn id(&self) -> HeaderId {
        match self {
            Self::Asn(h) => h.id,
            Self::Order(h) => h.id,
        }
    }

    pub fn client_id(&self) -> ClientId {
        match self {
            Self::Asn(h) => h.client_id,
            Self::Order(h) => h.client_id,
        }
    }

    pub fn business_key(&self) -> &str {
        match self {
            Self::Asn(h) => h.business_key(),
            Self::Order(h) => h.business_key(),
        }
    }
}
