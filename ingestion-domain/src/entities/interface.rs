// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `Interface` entity: a per-client inbound document definition
//! (`spec.md` §3). The triple `(client, root_element, namespace)` is how an
//! incoming XML payload is matched to the interface that should process it.

use serde::{Deserialize, Serialize};

use crate::value_objects::{ClientId, DocumentType, InterfaceId};

/// A `:FLEXIBLE` suffix on `root_element` switches schema validation (C3)
/// into structural-only mode (`spec.md` §4.3). Parsed once here so callers
/// never have to string-match the suffix themselves.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RootElement {
    local_name: String,
    flexible: bool,
}

impl RootElement {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix(":FLEXIBLE") {
            Some(stripped) => Self {
                local_name: stripped.to_string(),
                flexible: true,
            },
            None => Self {
                local_name: raw.to_string(),
                flexible: false,
            },
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn is_flexible(&self) -> bool {
        self.flexible
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    id: InterfaceId,
    client_id: ClientId,
    name: String,
    document_type: DocumentType,
    root_element: RootElement,
    namespace: Option<String>,
    schema_path: String,
    active: bool,
    priority: i32,
}

impl Interface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: ClientId,
        name: impl Into<String>,
        document_type: DocumentType,
        root_element: &str,
        namespace: Option<String>,
        schema_path: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: InterfaceId::new(),
            client_id,
            name: name.into(),
            document_type,
            root_element: RootElement::parse(root_element),
            namespace,
            schema_path: schema_path.into(),
            active: true,
            priority,
        }
    }

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document_type(&self) -> &DocumentType {
        &self.document_type
    }

    pub fn root_element(&self) -> &RootElement {
        &self.root_element
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn schema_path(&self) -> &str {
        &self.schema_path
    }

    /// Builder hook for reconstituting an inactive row from storage
    /// (`Interface` is otherwise always born active, `spec.md` §3).
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether an incoming document's root local-name and namespace URI are
    /// compatible with this interface (`spec.md` §4.3 step 2).
    pub fn matches_root(&self, local_name: &str, namespace: Option<&str>) -> bool {
        self.root_element.local_name() == local_name && self.namespace.as_deref() == namespace
    }
}
