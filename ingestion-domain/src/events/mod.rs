// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain events (`spec.md` §4.10).

mod ingestion_event;

pub use ingestion_event::{IngestionEvent, IngestionObserver};
