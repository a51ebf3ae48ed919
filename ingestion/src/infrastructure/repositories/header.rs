// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ASN_HEADERS`/`ORDER_HEADERS` repository (C7, `spec.md` §4.7). One
//! `DocumentHeader` enum dispatches to the table matching its variant.

use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use ingestion_domain::entities::{AsnHeader, DocumentHeader, OrderHeader};
use ingestion_domain::error::IngestionError;
use ingestion_domain::repositories::HeaderRepository;
use ingestion_domain::value_objects::{ClientId, HeaderId, InterfaceId};

pub struct SqliteHeaderRepository {
    pool: SqlitePool,
}

impl SqliteHeaderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_opt<T: FromStr>(raw: Option<String>) -> Option<T> {
        raw.and_then(|s| s.parse::<T>().ok())
    }

    fn asn_header_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentHeader, IngestionError> {
        Ok(DocumentHeader::Asn(AsnHeader {
            id: HeaderId::parse(&row.try_get::<String, _>("id").unwrap_or_default())?,
            client_id: ClientId::parse(&row.try_get::<String, _>("client_id").unwrap_or_default())?,
            interface_id: InterfaceId::parse(&row.try_get::<String, _>("interface_id").unwrap_or_default())?,
            asn_number: row.try_get("asn_number").unwrap_or_default(),
            status: row.try_get("status").unwrap_or_default(),
            ship_date: Self::parse_opt::<NaiveDate>(row.try_get("ship_date").ok()),
            carrier: row.try_get("carrier").ok(),
            supplier_code: row.try_get("supplier_code").ok(),
            total_weight: Self::parse_opt::<BigDecimal>(row.try_get("total_weight").ok()),
        }))
    }

    fn order_header_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentHeader, IngestionError> {
        Ok(DocumentHeader::Order(OrderHeader {
            id: HeaderId::parse(&row.try_get::<String, _>("id").unwrap_or_default())?,
            client_id: ClientId::parse(&row.try_get::<String, _>("client_id").unwrap_or_default())?,
            interface_id: InterfaceId::parse(&row.try_get::<String, _>("interface_id").unwrap_or_default())?,
            order_number: row.try_get("order_number").unwrap_or_default(),
            status: row.try_get("status").unwrap_or_default(),
            order_date: Self::parse_opt::<NaiveDate>(row.try_get("order_date").ok()),
            customer_po: row.try_get("customer_po").ok(),
            total_amount: Self::parse_opt::<BigDecimal>(row.try_get("total_amount").ok()),
        }))
    }

    async fn insert_asn(&self, h: &AsnHeader) -> Result<(), IngestionError> {
        sqlx::query(
            "INSERT INTO ASN_HEADERS \
             (id, client_id, interface_id, asn_number, status, ship_date, carrier, supplier_code, total_weight) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(h.id.to_string())
        .bind(h.client_id.to_string())
        .bind(h.interface_id.to_string())
        .bind(&h.asn_number)
        .bind(&h.status)
        .bind(h.ship_date.map(|d| d.to_string()))
        .bind(&h.carrier)
        .bind(&h.supplier_code)
        .bind(h.total_weight.as_ref().map(|v| v.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("insert asn header: {e}")))?;
        Ok(())
    }

    async fn insert_order(&self, h: &OrderHeader) -> Result<(), IngestionError> {
        sqlx::query(
            "INSERT INTO ORDER_HEADERS \
             (id, client_id, interface_id, order_number, status, order_date, customer_po, total_amount) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(h.id.to_string())
        .bind(h.client_id.to_string())
        .bind(h.interface_id.to_string())
        .bind(&h.order_number)
        .bind(&h.status)
        .bind(h.order_date.map(|d| d.to_string()))
        .bind(&h.customer_po)
        .bind(h.total_amount.as_ref().map(|v| v.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("insert order header: {e}")))?;
        Ok(())
    }

    async fn update_asn(&self, h: &AsnHeader) -> Result<(), IngestionError> {
        sqlx::query(
            "UPDATE ASN_HEADERS SET status = ?, ship_date = ?, carrier = ?, supplier_code = ?, total_weight = ? \
             WHERE id = ?",
        )
        .bind(&h.status)
        .bind(h.ship_date.map(|d| d.to_string()))
        .bind(&h.carrier)
        .bind(&h.supplier_code)
        .bind(h.total_weight.as_ref().map(|v| v.to_string()))
        .bind(h.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("update asn header: {e}")))?;
        Ok(())
    }

    async fn update_order(&self, h: &OrderHeader) -> Result<(), IngestionError> {
        sqlx::query(
            "UPDATE ORDER_HEADERS SET status = ?, order_date = ?, customer_po = ?, total_amount = ? WHERE id = ?",
        )
        .bind(&h.status)
        .bind(h.order_date.map(|d| d.to_string()))
        .bind(&h.customer_po)
        .bind(h.total_amount.as_ref().map(|v| v.to_string()))
        .bind(h.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("update order header: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl HeaderRepository for SqliteHeaderRepository {
    async fn create(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError> {
        if header.business_key().trim().is_empty() {
            return Err(IngestionError::validation("business_key", "must not be empty"));
        }
        match &header {
            DocumentHeader::Asn(h) => self.insert_asn(h).await?,
            DocumentHeader::Order(h) => self.insert_order(h).await?,
        }
        Ok(header)
    }

    async fn update(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError> {
        match &header {
            DocumentHeader::Asn(h) => self.update_asn(h).await?,
            DocumentHeader::Order(h) => self.update_order(h).await?,
        }
        Ok(header)
    }

    async fn delete(&self, id: HeaderId) -> Result<(), IngestionError> {
        let id_str = id.to_string();
        sqlx::query("DELETE FROM ASN_HEADERS WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("delete asn header: {e}")))?;
        sqlx::query("DELETE FROM ORDER_HEADERS WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("delete order header: {e}")))?;
        Ok(())
    }

    async fn find_by_id(&self, id: HeaderId) -> Result<Option<DocumentHeader>, IngestionError> {
        let id_str = id.to_string();
        if let Some(row) = sqlx::query("SELECT * FROM ASN_HEADERS WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("find asn header: {e}")))?
        {
            return Ok(Some(Self::asn_header_from_row(&row)?));
        }
        if let Some(row) = sqlx::query("SELECT * FROM ORDER_HEADERS WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("find order header: {e}")))?
        {
            return Ok(Some(Self::order_header_from_row(&row)?));
        }
        Ok(None)
    }

    async fn find_by_client(
        &self,
        client_id: ClientId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<DocumentHeader>, IngestionError> {
        let offset = (page.saturating_sub(1)) * page_size;
        let asn_rows = sqlx::query(
            "SELECT * FROM ASN_HEADERS WHERE client_id = ? ORDER BY rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(client_id.to_string())
        .bind(page_size as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("find asn headers by client: {e}")))?;

        let order_rows = sqlx::query(
            "SELECT * FROM ORDER_HEADERS WHERE client_id = ? ORDER BY rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(client_id.to_string())
        .bind(page_size as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("find order headers by client: {e}")))?;

        let mut headers = asn_rows
            .iter()
            .map(Self::asn_header_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        headers.extend(order_rows.iter().map(Self::order_header_from_row).collect::<Result<Vec<_>, _>>()?);
        Ok(headers)
    }
}
