// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structured logging setup (`tracing` + `tracing-subscriber`). One call,
//! made once at process start by `ingestion-bootstrap`, wires an
//! `EnvFilter` (`RUST_LOG`, default `info`) to either JSON or
//! human-readable output depending on `json`.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber. Safe to call at most once;
/// a second call is a logic error in the caller, not something this
/// function guards against, since `ingestion-bootstrap` is the only caller.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_target(true);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
