// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Connection pool + schema bootstrap (`spec.md` §6 `Persistent state`).
//! Table layout follows the teacher's old-generation `sqlite_repository.rs`
//! connect/`ensure_table_exists` idiom, but every column here is typed and
//! named, not a JSON blob.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use ingestion_domain::error::IngestionError;

/// `CREATE TABLE`/`CREATE INDEX` statements for every table in `spec.md`
/// §6's persistent state list, one statement per array entry since `sqlx`
/// prepares and executes exactly one statement per call. Column names are
/// snake_case; `MAPPING_RULES.target_field` values are expected to match a
/// column name in one of the four document tables exactly.
pub const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS CLIENTS (
        id TEXT PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        status TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS INTERFACES (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        name TEXT NOT NULL,
        document_type TEXT NOT NULL,
        root_element TEXT NOT NULL,
        namespace TEXT,
        schema_path TEXT NOT NULL,
        active INTEGER NOT NULL,
        priority INTEGER NOT NULL,
        UNIQUE (client_id, name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS MAPPING_RULES (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        interface_id TEXT NOT NULL,
        name TEXT NOT NULL,
        source_field TEXT NOT NULL,
        target_field TEXT NOT NULL,
        target_level TEXT NOT NULL,
        table_name TEXT NOT NULL,
        transformation TEXT NOT NULL,
        default_value TEXT,
        required INTEGER NOT NULL,
        is_active INTEGER NOT NULL,
        priority INTEGER NOT NULL,
        data_type TEXT NOT NULL,
        validation_rule TEXT
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_mapping_rules_interface ON MAPPING_RULES(interface_id, is_active)"#,
    r#"CREATE TABLE IF NOT EXISTS ASN_HEADERS (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        interface_id TEXT NOT NULL,
        asn_number TEXT NOT NULL,
        status TEXT NOT NULL,
        ship_date TEXT,
        carrier TEXT,
        supplier_code TEXT,
        total_weight TEXT,
        UNIQUE (asn_number, client_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ASN_LINES (
        id TEXT PRIMARY KEY,
        header_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        line_number INTEGER NOT NULL,
        item_number TEXT,
        quantity TEXT,
        unit_of_measure TEXT,
        lot_number TEXT,
        UNIQUE (header_id, line_number)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_asn_lines_header ON ASN_LINES(header_id)"#,
    r#"CREATE TABLE IF NOT EXISTS ORDER_HEADERS (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        interface_id TEXT NOT NULL,
        order_number TEXT NOT NULL,
        status TEXT NOT NULL,
        order_date TEXT,
        customer_po TEXT,
        total_amount TEXT,
        UNIQUE (order_number, client_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS ORDER_LINES (
        id TEXT PRIMARY KEY,
        header_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        line_number INTEGER NOT NULL,
        sku TEXT,
        quantity TEXT,
        unit_price TEXT,
        UNIQUE (header_id, line_number)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_order_lines_header ON ORDER_LINES(header_id)"#,
    r#"CREATE TABLE IF NOT EXISTS PROCESSED_FILES (
        id TEXT PRIMARY KEY,
        file_name TEXT NOT NULL,
        client_id TEXT NOT NULL,
        interface_id TEXT NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        content BLOB,
        processed_at TEXT
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_processed_files_lookup ON PROCESSED_FILES(file_name, interface_id)"#,
];

/// Opens a pooled connection to `database_url` (a `sqlite://` URL, or
/// `sqlite::memory:` for tests) and applies every statement in [`SCHEMA`].
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, IngestionError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| IngestionError::configuration(format!("failed to connect to '{database_url}': {e}")))?;

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(|e| IngestionError::configuration(format!("failed to apply schema: {e}")))?;
    }

    Ok(pool)
}
