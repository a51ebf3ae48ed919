// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `Client` entity: a tenant of the ingestion system (`spec.md` §3).
//! Owns `Interface`s and, transitively through them, documents.

use serde::{Deserialize, Serialize};

use crate::value_objects::{ClientId, ClientStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    id: ClientId,
    code: String,
    name: String,
    status: ClientStatus,
}

impl Client {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            code: code.into(),
            name: name.into(),
            status: ClientStatus::Active,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ClientStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ClientStatus::Active)
    }

    pub fn deactivate(&mut self) {
        self.status = ClientStatus::Inactive;
    }
}
