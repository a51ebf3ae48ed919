// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Repository ports (`spec.md` §4.5, §4.7): persistence interfaces
//! implemented by `ingestion::infrastructure::persistence` against SQLite.

pub mod header_repository;
pub mod interface_repository;
pub mod line_repository;
pub mod mapping_rule_repository;
pub mod processed_file_repository;

pub use header_repository::HeaderRepository;
pub use interface_repository::InterfaceRepository;
pub use line_repository::LineRepository;
pub use mapping_rule_repository::MappingRuleRepository;
pub use processed_file_repository::{ProcessedFileRepository, ProcessedFileUpdate};
