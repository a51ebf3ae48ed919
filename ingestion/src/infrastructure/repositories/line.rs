// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `ASN_LINES`/`ORDER_LINES` repository (C7, `spec.md` §4.7). Batches are
//! saved in chunks of the caller-supplied batch size (C9); a chunk that
//! fails rolls back only that chunk, via a dedicated `sqlx` transaction per
//! chunk.

use bigdecimal::BigDecimal;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ingestion_domain::entities::{validate_batch, AsnLine, DocumentLine, OrderLine};
use ingestion_domain::error::IngestionError;
use ingestion_domain::repositories::LineRepository;
use ingestion_domain::value_objects::{DocumentLineId, HeaderId};

pub struct SqliteLineRepository {
    pool: SqlitePool,
}

impl SqliteLineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_opt<T: FromStr>(raw: Option<String>) -> Option<T> {
        raw.and_then(|s| s.parse::<T>().ok())
    }

    fn asn_line_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentLine, IngestionError> {
        Ok(DocumentLine::Asn(AsnLine {
            id: DocumentLineId::parse(&row.try_get::<String, _>("id").unwrap_or_default())?,
            header_id: HeaderId::parse(&row.try_get::<String, _>("header_id").unwrap_or_default())?,
            client_id: ingestion_domain::value_objects::ClientId::parse(
                &row.try_get::<String, _>("client_id").unwrap_or_default(),
            )?,
            line_number: row.try_get("line_number").unwrap_or_default(),
            item_number: row.try_get("item_number").ok(),
            quantity: Self::parse_opt::<BigDecimal>(row.try_get("quantity").ok()),
            unit_of_measure: row.try_get("unit_of_measure").ok(),
            lot_number: row.try_get("lot_number").ok(),
        }))
    }

    fn order_line_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentLine, IngestionError> {
        Ok(DocumentLine::Order(OrderLine {
            id: DocumentLineId::parse(&row.try_get::<String, _>("id").unwrap_or_default())?,
            header_id: HeaderId::parse(&row.try_get::<String, _>("header_id").unwrap_or_default())?,
            client_id: ingestion_domain::value_objects::ClientId::parse(
                &row.try_get::<String, _>("client_id").unwrap_or_default(),
            )?,
            line_number: row.try_get("line_number").unwrap_or_default(),
            sku: row.try_get("sku").ok(),
            quantity: Self::parse_opt::<BigDecimal>(row.try_get("quantity").ok()),
            unit_price: Self::parse_opt::<BigDecimal>(row.try_get("unit_price").ok()),
        }))
    }

    async fn insert_chunk(&self, chunk: &[DocumentLine]) -> Result<(), IngestionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IngestionError::persistence(format!("begin line chunk transaction: {e}")))?;

        for line in chunk {
            match line {
                DocumentLine::Asn(l) => {
                    sqlx::query(
                        "INSERT INTO ASN_LINES \
                         (id, header_id, client_id, line_number, item_number, quantity, unit_of_measure, lot_number) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(l.id.to_string())
                    .bind(l.header_id.to_string())
                    .bind(l.client_id.to_string())
                    .bind(l.line_number)
                    .bind(&l.item_number)
                    .bind(l.quantity.as_ref().map(|v| v.to_string()))
                    .bind(&l.unit_of_measure)
                    .bind(&l.lot_number)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| IngestionError::persistence(format!("insert asn line: {e}")))?;
                }
                DocumentLine::Order(l) => {
                    sqlx::query(
                        "INSERT INTO ORDER_LINES (id, header_id, client_id, line_number, sku, quantity, unit_price) \
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(l.id.to_string())
                    .bind(l.header_id.to_string())
                    .bind(l.client_id.to_string())
                    .bind(l.line_number)
                    .bind(&l.sku)
                    .bind(l.quantity.as_ref().map(|v| v.to_string()))
                    .bind(l.unit_price.as_ref().map(|v| v.to_string()))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| IngestionError::persistence(format!("insert order line: {e}")))?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| IngestionError::persistence(format!("commit line chunk transaction: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl LineRepository for SqliteLineRepository {
    async fn create_batch(&self, lines: Vec<DocumentLine>, batch_size: usize) -> Result<Vec<DocumentLine>, IngestionError> {
        validate_batch(&lines)?;
        let chunk_size = batch_size.max(1);
        for chunk in lines.chunks(chunk_size) {
            self.insert_chunk(chunk).await?;
        }
        Ok(lines)
    }

    async fn find_by_header(&self, header_id: HeaderId) -> Result<Vec<DocumentLine>, IngestionError> {
        let header_id_str = header_id.to_string();
        let asn_rows = sqlx::query("SELECT * FROM ASN_LINES WHERE header_id = ? ORDER BY line_number ASC")
            .bind(&header_id_str)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("find asn lines: {e}")))?;
        if !asn_rows.is_empty() {
            return asn_rows.iter().map(Self::asn_line_from_row).collect();
        }

        let order_rows = sqlx::query("SELECT * FROM ORDER_LINES WHERE header_id = ? ORDER BY line_number ASC")
            .bind(&header_id_str)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("find order lines: {e}")))?;
        order_rows.iter().map(Self::order_line_from_row).collect()
    }

    async fn delete(&self, id: DocumentLineId) -> Result<(), IngestionError> {
        let id_str = id.to_string();
        sqlx::query("DELETE FROM ASN_LINES WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("delete asn line: {e}")))?;
        sqlx::query("DELETE FROM ORDER_LINES WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("delete order line: {e}")))?;
        Ok(())
    }

    async fn delete_by_header(&self, header_id: HeaderId) -> Result<(), IngestionError> {
        let header_id_str = header_id.to_string();
        sqlx::query("DELETE FROM ASN_LINES WHERE header_id = ?")
            .bind(&header_id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("delete asn lines by header: {e}")))?;
        sqlx::query("DELETE FROM ORDER_LINES WHERE header_id = ?")
            .bind(&header_id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("delete order lines by header: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::pool::connect;
    use ingestion_domain::value_objects::ClientId;

    #[tokio::test]
    async fn saves_batch_in_chunks_and_reads_back_in_line_order() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let repo = SqliteLineRepository::new(pool);
        let header = HeaderId::new();
        let client = ClientId::new();
        let lines: Vec<DocumentLine> = (1..=5)
            .map(|n| DocumentLine::Asn(AsnLine::new_default(header, client, n)))
            .collect();

        let saved = repo.create_batch(lines, 2).await.unwrap();
        assert_eq!(saved.len(), 5);

        let found = repo.find_by_header(header).await.unwrap();
        assert_eq!(found.len(), 5);
        assert_eq!(found[0].line_number(), 1);
        assert_eq!(found[4].line_number(), 5);
    }

    #[tokio::test]
    async fn rejects_batch_with_duplicate_line_numbers() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let repo = SqliteLineRepository::new(pool);
        let header = HeaderId::new();
        let client = ClientId::new();
        let lines = vec![
            DocumentLine::Asn(AsnLine::new_default(header, client, 1)),
            DocumentLine::Asn(AsnLine::new_default(header, client, 1)),
        ];
        assert!(repo.create_batch(lines, 10).await.is_err());
    }
}
