// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Adapters implementing the `ingestion_domain` ports: everything here
//! touches a file, a socket, a database, or a C library. Nothing under
//! `application/` is allowed to depend on a concrete type from here except
//! through dependency injection at startup (`ingestion-bootstrap`).

pub mod batching;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod repositories;
pub mod resilience;
pub mod schema;
pub mod strategies;
pub mod transform;
pub mod worker_pool;
pub mod xml;
