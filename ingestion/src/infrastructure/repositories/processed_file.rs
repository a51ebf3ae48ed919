// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `PROCESSED_FILES` repository (C7, `spec.md` §4.7, §3). `update` applies
//! only the `Some` fields of a [`ProcessedFileUpdate`] - the ingestion
//! ledger's atomic partial-update contract.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use async_trait::async_trait;

use ingestion_domain::entities::ProcessedFile;
use ingestion_domain::error::IngestionError;
use ingestion_domain::repositories::{ProcessedFileRepository, ProcessedFileUpdate};
use ingestion_domain::value_objects::{ClientId, InterfaceId, ProcessedFileId, ProcessedFileStatus};

pub struct SqliteProcessedFileRepository {
    pool: SqlitePool,
}

impl SqliteProcessedFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn status_to_str(status: ProcessedFileStatus) -> &'static str {
        match status {
            ProcessedFileStatus::Processing => "PROCESSING",
            ProcessedFileStatus::Success => "SUCCESS",
            ProcessedFileStatus::Error => "ERROR",
        }
    }

    fn status_from_str(raw: &str) -> ProcessedFileStatus {
        match raw {
            "SUCCESS" => ProcessedFileStatus::Success,
            "ERROR" => ProcessedFileStatus::Error,
            _ => ProcessedFileStatus::Processing,
        }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProcessedFile, IngestionError> {
        let processed_at: Option<String> = row.try_get("processed_at").ok().flatten();
        Ok(ProcessedFile::from_parts(
            ProcessedFileId::parse(&row.try_get::<String, _>("id").unwrap_or_default())?,
            row.try_get("file_name").unwrap_or_default(),
            ClientId::parse(&row.try_get::<String, _>("client_id").unwrap_or_default())?,
            InterfaceId::parse(&row.try_get::<String, _>("interface_id").unwrap_or_default())?,
            Self::status_from_str(&row.try_get::<String, _>("status").unwrap_or_default()),
            row.try_get("error_message").ok().flatten(),
            row.try_get::<Option<Vec<u8>>, _>("content").ok().flatten(),
            processed_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc)),
        ))
    }
}

#[async_trait]
impl ProcessedFileRepository for SqliteProcessedFileRepository {
    async fn create(&self, file: ProcessedFile) -> Result<ProcessedFile, IngestionError> {
        sqlx::query(
            "INSERT INTO PROCESSED_FILES \
             (id, file_name, client_id, interface_id, status, error_message, content, processed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.id().to_string())
        .bind(file.file_name())
        .bind(file.client_id().to_string())
        .bind(file.interface_id().to_string())
        .bind(Self::status_to_str(file.status()))
        .bind(file.error_message())
        .bind(file.content())
        .bind(file.processed_at().map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("create processed file: {e}")))?;
        Ok(file)
    }

    async fn update(&self, id: ProcessedFileId, fields: ProcessedFileUpdate) -> Result<ProcessedFile, IngestionError> {
        let id_str = id.to_string();
        let existing = sqlx::query("SELECT * FROM PROCESSED_FILES WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("load processed file for update: {e}")))?
            .ok_or_else(|| IngestionError::persistence(format!("processed file {id_str} not found")))?;
        let mut current = Self::from_row(&existing)?;

        let now = Utc::now();
        if let Some(status) = fields.status {
            match status {
                ProcessedFileStatus::Success => {
                    current.mark_success(fields.content.clone().unwrap_or_default(), now)?;
                }
                ProcessedFileStatus::Error => {
                    current.mark_error(fields.error_message.clone().unwrap_or_default(), now)?;
                }
                ProcessedFileStatus::Processing => {}
            }
        }

        sqlx::query(
            "UPDATE PROCESSED_FILES SET status = ?, error_message = ?, content = ?, processed_at = ? WHERE id = ?",
        )
        .bind(Self::status_to_str(current.status()))
        .bind(current.error_message())
        .bind(current.content())
        .bind(current.processed_at().map(|dt| dt.to_rfc3339()))
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("update processed file: {e}")))?;

        Ok(current)
    }

    async fn find_latest(
        &self,
        file_name: &str,
        interface_id: InterfaceId,
    ) -> Result<Option<ProcessedFile>, IngestionError> {
        let row = sqlx::query(
            "SELECT * FROM PROCESSED_FILES WHERE file_name = ? AND interface_id = ? ORDER BY rowid DESC LIMIT 1",
        )
        .bind(file_name)
        .bind(interface_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("find latest processed file: {e}")))?;

        row.as_ref().map(Self::from_row).transpose()
    }
}

/// `find_or_create_processed_file(file_name, interface, default)`
/// (`spec.md` §4.7): idempotent upsert keyed by `(file_name, interface_id)`,
/// used by the orchestrator (C10 step 2) rather than exposed on the
/// `ProcessedFileRepository` trait itself, since it composes two port calls.
pub async fn find_or_create(
    repo: &SqliteProcessedFileRepository,
    file_name: &str,
    client_id: ClientId,
    interface_id: InterfaceId,
) -> Result<ProcessedFile, IngestionError> {
    if let Some(existing) = repo.find_latest(file_name, interface_id).await? {
        return Ok(existing);
    }
    repo.create(ProcessedFile::new(file_name, client_id, interface_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::pool::connect;

    #[tokio::test]
    async fn create_then_update_to_success_transitions_terminal() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let repo = SqliteProcessedFileRepository::new(pool);
        let client = ClientId::new();
        let interface = InterfaceId::new();
        let file = ProcessedFile::new("a.xml", client, interface);
        let created = repo.create(file).await.unwrap();

        let updated = repo
            .update(
                created.id(),
                ProcessedFileUpdate {
                    status: Some(ProcessedFileStatus::Success),
                    content: Some(b"<a/>".to_vec()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(updated.status(), ProcessedFileStatus::Success));

        let latest = repo.find_latest("a.xml", interface).await.unwrap().unwrap();
        assert!(matches!(latest.status(), ProcessedFileStatus::Success));
    }

    #[tokio::test]
    async fn find_latest_returns_none_when_absent() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let repo = SqliteProcessedFileRepository::new(pool);
        assert!(repo.find_latest("missing.xml", InterfaceId::new()).await.unwrap().is_none());
    }
}
