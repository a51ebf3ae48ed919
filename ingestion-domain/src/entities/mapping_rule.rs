// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `MappingRule` entity: a one-line contract from an XPath to a target
//! column (`spec.md` §3). `source_field` must be syntactically valid XPath,
//! enforced by [`XPathExpr`] at construction.

use serde::{Deserialize, Serialize};

use crate::value_objects::{ClientId, DataType, InterfaceId, MappingRuleId, TargetLevel, TransformationChain, XPathExpr};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    id: MappingRuleId,
    client_id: ClientId,
    interface_id: InterfaceId,
    name: String,
    source_field: XPathExpr,
    target_field: String,
    target_level: TargetLevel,
    table_name: String,
    transformation: TransformationChain,
    default_value: Option<String>,
    required: bool,
    is_active: bool,
    priority: i32,
    data_type: DataType,
    validation_rule: Option<String>,
}

impl MappingRule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: ClientId,
        interface_id: InterfaceId,
        name: impl Into<String>,
        source_field: &str,
        target_field: impl Into<String>,
        target_level: TargetLevel,
        table_name: impl Into<String>,
        data_type: DataType,
        priority: i32,
    ) -> Result<Self, crate::error::IngestionError> {
        Ok(Self {
            id: MappingRuleId::new(),
            client_id,
            interface_id,
            name: name.into(),
            source_field: XPathExpr::parse(source_field)?,
            target_field: target_field.into(),
            target_level,
            table_name: table_name.into(),
            transformation: TransformationChain::default(),
            default_value: None,
            required: false,
            is_active: true,
            priority,
            data_type,
            validation_rule: None,
        })
    }

    pub fn with_transformation(mut self, chain: &str) -> Self {
        self.transformation = TransformationChain::parse(chain);
        self
    }

    pub fn with_default_value(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn id(&self) -> MappingRuleId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.interface_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_field(&self) -> &XPathExpr {
        &self.source_field
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    pub fn target_level(&self) -> TargetLevel {
        self.target_level
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn transformation(&self) -> &TransformationChain {
        &self.transformation
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn validation_rule(&self) -> Option<&str> {
        self.validation_rule.as_deref()
    }
}

/// Stable ordering used everywhere rules are listed: priority ascending,
/// then id (`spec.md` §4.5).
pub fn sort_rules_stable(rules: &mut [MappingRule]) {
    rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
}
