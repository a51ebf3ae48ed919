// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Mapping-rule store port (C5, `spec.md` §4.5).

use async_trait::async_trait;

use crate::entities::MappingRule;
use crate::error::IngestionError;
use crate::value_objects::{ClientId, InterfaceId};

#[async_trait]
pub trait MappingRuleRepository: Send + Sync {
    /// Every active rule for `interface_id`, ordered by priority ascending
    /// then id (`spec.md` §4.5; `crate::entities::sort_rules_stable`).
    async fn active_by_interface(&self, interface_id: InterfaceId) -> Result<Vec<MappingRule>, IngestionError>;

    /// Active rules for one `(client, interface, table)` triple, same
    /// ordering as [`Self::active_by_interface`].
    async fn by_client_interface_table(
        &self,
        client_id: ClientId,
        interface_id: InterfaceId,
        table_name: &str,
    ) -> Result<Vec<MappingRule>, IngestionError>;
}
