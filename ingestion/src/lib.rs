// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application and infrastructure layers for the XML ingestion pipeline.
//!
//! `application` wires the domain ports (`ingestion_domain`) into one
//! use case, [`application::PipelineOrchestrator`] (C10), that drives a
//! single inbound document from parse through persistence.
//! `infrastructure` implements every domain port against a concrete
//! dependency: `libxml` for XML/XSD (C2/C3), a hand-rolled circuit breaker
//! (C4), `sqlx`/SQLite for persistence (C5/C7), `lapin`/`deadpool-lapin`
//! for the priority-queue worker pool (C8), and `sysinfo` for the adaptive
//! batch sizer (C9). Nothing in `application` depends on a concrete type
//! from `infrastructure` except through dependency injection performed by
//! `ingestion-bootstrap`, the composition root.

pub mod application;
pub mod infrastructure;
