// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Interface lookup port (C10 step 1, `spec.md` §4.10). `Interface`/`Client`
//! CRUD lives behind the admin HTTP API (`spec.md` §6, explicitly out of
//! core scope); the core only ever reads an `Interface` by id to drive one
//! message through the pipeline.

use async_trait::async_trait;

use crate::entities::Interface;
use crate::error::IngestionError;
use crate::value_objects::InterfaceId;

#[async_trait]
pub trait InterfaceRepository: Send + Sync {
    async fn find_by_id(&self, id: InterfaceId) -> Result<Option<Interface>, IngestionError>;
}
