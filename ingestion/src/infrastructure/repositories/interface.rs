// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `INTERFACES` read repository (C10 step 1, `spec.md` §4.10). Write access
//! belongs to the admin HTTP API (`spec.md` §6), out of core scope.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ingestion_domain::entities::Interface;
use ingestion_domain::error::IngestionError;
use ingestion_domain::repositories::InterfaceRepository;
use ingestion_domain::value_objects::{ClientId, DocumentType, InterfaceId};

pub struct SqliteInterfaceRepository {
    pool: SqlitePool,
}

impl SqliteInterfaceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterfaceRepository for SqliteInterfaceRepository {
    async fn find_by_id(&self, id: InterfaceId) -> Result<Option<Interface>, IngestionError> {
        let row = sqlx::query("SELECT * FROM INTERFACES WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestionError::persistence(format!("find interface: {e}")))?;

        let Some(row) = row else { return Ok(None) };
        let client_id = ClientId::parse(&row.try_get::<String, _>("client_id").unwrap_or_default())?;
        let document_type = DocumentType::new(row.try_get::<String, _>("document_type").unwrap_or_default());
        let namespace: Option<String> = row.try_get("namespace").ok().flatten();
        let active: i64 = row.try_get("active").unwrap_or(1);

        let mut interface = Interface::new(
            client_id,
            row.try_get::<String, _>("name").unwrap_or_default(),
            document_type,
            &row.try_get::<String, _>("root_element").unwrap_or_default(),
            namespace,
            row.try_get::<String, _>("schema_path").unwrap_or_default(),
            row.try_get("priority").unwrap_or(0),
        );
        if active == 0 {
            interface = interface.deactivated();
        }
        Ok(Some(interface))
    }
}

/// Inserts one interface row; used by seed scripts and tests (interface
/// authoring is otherwise the admin HTTP API's job, `spec.md` §6).
pub async fn insert(pool: &SqlitePool, interface: &Interface) -> Result<(), IngestionError> {
    sqlx::query(
        "INSERT INTO INTERFACES \
         (id, client_id, name, document_type, root_element, namespace, schema_path, active, priority) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(interface.id().to_string())
    .bind(interface.client_id().to_string())
    .bind(interface.name())
    .bind(interface.document_type().as_str())
    .bind(if interface.root_element().is_flexible() {
        format!("{}:FLEXIBLE", interface.root_element().local_name())
    } else {
        interface.root_element().local_name().to_string()
    })
    .bind(interface.namespace())
    .bind(interface.schema_path())
    .bind(interface.is_active() as i64)
    .bind(interface.priority() as i64)
    .execute(pool)
    .await
    .map_err(|e| IngestionError::persistence(format!("insert interface: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::pool::connect;
    use ingestion_domain::value_objects::ClientId;

    #[tokio::test]
    async fn round_trips_an_interface_row() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let interface = Interface::new(
            ClientId::new(),
            "inbound-asn",
            DocumentType::new("ASN"),
            "ASN",
            None,
            "/schemas/asn.xsd",
            10,
        );
        insert(&pool, &interface).await.unwrap();

        let repo = SqliteInterfaceRepository::new(pool);
        let found = repo.find_by_id(interface.id()).await.unwrap().unwrap();
        assert_eq!(found.name(), "inbound-asn");
        assert_eq!(found.root_element().local_name(), "ASN");
    }
}
