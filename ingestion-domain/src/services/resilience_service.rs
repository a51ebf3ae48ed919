// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Circuit breaker / retry port (C4, `spec.md` §4.4).
//!
//! Every call into C7 (and any external lookup from C5/C6) is wrapped by a
//! named breaker. The state machine itself is domain logic — it has no I/O —
//! but `execute` is `async` because the wrapped operation is.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::IngestionError;

/// One breaker's configuration. Immutable once the breaker is constructed;
/// changing thresholds means registering a new breaker name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerConfig {
    /// Percentage (0-100) of failures in the sliding window that trips the
    /// breaker open.
    pub failure_rate_threshold: u8,
    /// Number of most-recent calls tracked for the failure-rate computation.
    pub sliding_window_size: u32,
    /// Minimum calls observed in the window before the failure rate is
    /// evaluated at all (avoids tripping on the first handful of calls).
    pub min_calls: u32,
    /// How long the breaker stays OPEN before probing with HALF_OPEN.
    pub wait_in_open: Duration,
    /// Consecutive successes required in HALF_OPEN to close the breaker.
    pub half_open_calls: u32,
    /// Per-call timeout; a timeout counts as a failure.
    pub call_timeout: Duration,
}

impl BreakerConfig {
    pub const fn new(
        failure_rate_threshold: u8,
        sliding_window_size: u32,
        min_calls: u32,
        wait_in_open: Duration,
        half_open_calls: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            failure_rate_threshold,
            sliding_window_size,
            min_calls,
            wait_in_open,
            half_open_calls,
            call_timeout,
        }
    }
}

impl Default for BreakerConfig {
    /// `spec.md` §4.4 "default" breaker: a middle-of-the-road profile
    /// suitable for repository calls absent a more specific config.
    fn default() -> Self {
        Self::new(50, 20, 5, Duration::from_secs(30), 3, Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// `execute`'s generic result type makes this trait usable only via static
/// dispatch (`Arc<ConcreteResilienceService>`, or a `R: ResilienceService`
/// bound) — not as `dyn ResilienceService`. Every other port in this module
/// stays object-safe; this one does not need to be, since C4 always wraps a
/// single known-at-the-call-site dependency.
#[async_trait]
pub trait ResilienceService: Send + Sync {
    /// Current state of the named breaker (creating it with
    /// [`BreakerConfig::default`] on first use).
    fn state(&self, breaker_name: &str) -> BreakerState;

    /// Runs `op` through the named breaker, falling back to `fallback`
    /// (invoked synchronously, not counted toward the window) when the
    /// breaker is OPEN. Timeouts past `call_timeout` count as a failure of
    /// `op`, not of the breaker machinery itself. `op` is `FnMut` rather
    /// than `FnOnce` because a recoverable failure is retried (bounded
    /// exponential backoff) before the breaker sees the call's final
    /// outcome (DESIGN.md open question (c)).
    async fn execute<F, Fut, T>(
        &self,
        breaker_name: &str,
        op: F,
        fallback: impl FnOnce() -> T + Send,
    ) -> Result<T, IngestionError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, IngestionError>> + Send,
        T: Send;
}
