// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `MAPPING_RULES` repository (C5, `spec.md` §4.5).

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use ingestion_domain::entities::{sort_rules_stable, MappingRule};
use ingestion_domain::error::IngestionError;
use ingestion_domain::repositories::MappingRuleRepository;
use ingestion_domain::value_objects::{ClientId, DataType, InterfaceId, TargetLevel};

pub struct SqliteMappingRuleRepository {
    pool: SqlitePool,
}

impl SqliteMappingRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<MappingRule, IngestionError> {
        let target_level = match row.try_get::<String, _>("target_level").unwrap_or_default().as_str() {
            "line" => TargetLevel::Line,
            _ => TargetLevel::Header,
        };
        let client_id = ClientId::parse(&row.try_get::<String, _>("client_id").unwrap_or_default())?;
        let interface_id = InterfaceId::parse(&row.try_get::<String, _>("interface_id").unwrap_or_default())?;
        let data_type = DataType::parse(&row.try_get::<String, _>("data_type").unwrap_or_default());

        let mut rule = MappingRule::new(
            client_id,
            interface_id,
            row.try_get::<String, _>("name").unwrap_or_default(),
            &row.try_get::<String, _>("source_field").unwrap_or_default(),
            row.try_get::<String, _>("target_field").unwrap_or_default(),
            target_level,
            row.try_get::<String, _>("table_name").unwrap_or_default(),
            data_type,
            row.try_get::<i64, _>("priority").unwrap_or(0) as i32,
        )?;

        let transformation: String = row.try_get("transformation").unwrap_or_default();
        if !transformation.is_empty() {
            rule = rule.with_transformation(&transformation);
        }
        if let Ok(Some(default_value)) = row.try_get::<Option<String>, _>("default_value") {
            rule = rule.with_default_value(default_value);
        }
        let required: i64 = row.try_get("required").unwrap_or(0);
        rule = rule.required(required != 0);

        Ok(rule)
    }
}

#[async_trait]
impl MappingRuleRepository for SqliteMappingRuleRepository {
    async fn active_by_interface(&self, interface_id: InterfaceId) -> Result<Vec<MappingRule>, IngestionError> {
        let rows = sqlx::query(
            "SELECT * FROM MAPPING_RULES WHERE interface_id = ? AND is_active = 1",
        )
        .bind(interface_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("active_by_interface: {e}")))?;

        let mut rules = rows.iter().map(Self::from_row).collect::<Result<Vec<_>, _>>()?;
        sort_rules_stable(&mut rules);
        Ok(rules)
    }

    async fn by_client_interface_table(
        &self,
        client_id: ClientId,
        interface_id: InterfaceId,
        table_name: &str,
    ) -> Result<Vec<MappingRule>, IngestionError> {
        let rows = sqlx::query(
            "SELECT * FROM MAPPING_RULES WHERE client_id = ? AND interface_id = ? AND table_name = ? AND is_active = 1",
        )
        .bind(client_id.to_string())
        .bind(interface_id.to_string())
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("by_client_interface_table: {e}")))?;

        let mut rules = rows.iter().map(Self::from_row).collect::<Result<Vec<_>, _>>()?;
        sort_rules_stable(&mut rules);
        Ok(rules)
    }
}

/// Inserts one rule; used by seed scripts and tests, not part of the C5 port
/// itself (rule authoring goes through the admin HTTP API, `spec.md` §6).
pub async fn insert(pool: &SqlitePool, rule: &MappingRule) -> Result<(), IngestionError> {
    sqlx::query(
        "INSERT INTO MAPPING_RULES \
         (id, client_id, interface_id, name, source_field, target_field, target_level, table_name, \
          transformation, default_value, required, is_active, priority, data_type, validation_rule) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(rule.id().to_string())
    .bind(rule.client_id().to_string())
    .bind(rule.interface_id().to_string())
    .bind(rule.name())
    .bind(rule.source_field().as_str())
    .bind(rule.target_field())
    .bind(match rule.target_level() {
        TargetLevel::Header => "header",
        TargetLevel::Line => "line",
    })
    .bind(rule.table_name())
    .bind(rule.transformation().to_raw())
    .bind(rule.default_value())
    .bind(rule.is_required() as i64)
    .bind(rule.is_active() as i64)
    .bind(rule.priority() as i64)
    .bind(rule.data_type().as_str())
    .bind(rule.validation_rule())
    .execute(pool)
    .await
    .map_err(|e| IngestionError::persistence(format!("insert mapping rule: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::pool::connect;

    #[tokio::test]
    async fn inserts_and_lists_active_rules_in_priority_order() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let client = ClientId::new();
        let interface = InterfaceId::new();
        let rule_b = MappingRule::new(client, interface, "b", "//B", "b", TargetLevel::Header, "ASN_HEADERS", DataType::String, 5).unwrap();
        let rule_a = MappingRule::new(client, interface, "a", "//A", "a", TargetLevel::Header, "ASN_HEADERS", DataType::String, 1).unwrap();
        insert(&pool, &rule_b).await.unwrap();
        insert(&pool, &rule_a).await.unwrap();

        let repo = SqliteMappingRuleRepository::new(pool);
        let rules = repo.active_by_interface(interface).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name(), "a");
        assert_eq!(rules[1].name(), "b");
    }
}
