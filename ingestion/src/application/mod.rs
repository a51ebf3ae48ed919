// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Use-case orchestration (C10, `spec.md` §4.10). This layer wires domain
//! ports to infrastructure implementations but never depends on a concrete
//! adapter directly except through the resilience service, whose `execute`
//! is deliberately not `dyn`-compatible (`ingestion::infrastructure::resilience`).

pub mod orchestrator;

pub use orchestrator::{Outcome, PipelineOrchestrator};
