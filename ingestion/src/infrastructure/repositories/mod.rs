// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed implementations of the C5/C7 persistence ports
//! (`spec.md` §4.5, §4.7, §6). Unlike the teacher's generic `SqliteEntity`
//! JSON-blob pattern, every table here has explicit, typed, snake_case
//! columns — `spec.md` §6 requires `MappingRule.target_field` values to
//! match column names exactly, which rules out an opaque `data` blob.

pub mod header;
pub mod interface;
pub mod line;
pub mod mapping_rule;
pub mod pool;
pub mod processed_file;

pub use header::SqliteHeaderRepository;
pub use interface::SqliteInterfaceRepository;
pub use line::SqliteLineRepository;
pub use mapping_rule::SqliteMappingRuleRepository;
pub use pool::{connect, SCHEMA};
pub use processed_file::SqliteProcessedFileRepository;
