// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Circuit breaker / retry (C4, `spec.md` §4.4). Every named breaker keeps a
//! fixed-size sliding window of outcomes behind a `parking_lot::Mutex` and a
//! `state` behind an atomic; `execute` is safe under parallel callers
//! because the window mutation and the state read/transition both happen
//! under that one lock (DESIGN.md open question (c) covers the retry layer).

pub mod retry;

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use ingestion_domain::error::IngestionError;
use ingestion_domain::services::{BreakerConfig, BreakerState};

struct SlidingWindow {
    outcomes: std::collections::VecDeque<bool>,
    capacity: usize,
}

impl SlidingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            outcomes: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn record(&mut self, success: bool) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
    }

    fn failure_rate(&self) -> u8 {
        if self.outcomes.is_empty() {
            return 0;
        }
        let failures = self.outcomes.iter().filter(|s| !**s).count();
        ((failures * 100) / self.outcomes.len()) as u8
    }

    fn clear(&mut self) {
        self.outcomes.clear();
    }
}

struct Breaker {
    config: BreakerConfig,
    state: BreakerState,
    window: SlidingWindow,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

impl Breaker {
    fn new(config: BreakerConfig) -> Self {
        let window = SlidingWindow::new(config.sliding_window_size as usize);
        Self {
            config,
            state: BreakerState::Closed,
            window,
            opened_at: None,
            half_open_successes: 0,
        }
    }

    /// Whether the breaker currently permits a call through, advancing
    /// OPEN -> HALF_OPEN if `wait_in_open` has elapsed (`spec.md` §4.4).
    fn permits_call(&mut self) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                if self.opened_at.map(|t| t.elapsed() >= self.config.wait_in_open).unwrap_or(false) {
                    self.state = BreakerState::HalfOpen;
                    self.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_outcome(&mut self, success: bool) {
        match self.state {
            BreakerState::HalfOpen => {
                if success {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= self.config.half_open_calls {
                        self.state = BreakerState::Closed;
                        self.window.clear();
                    }
                } else {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(Instant::now());
                    self.window.clear();
                }
            }
            BreakerState::Closed => {
                self.window.record(success);
                if self.window.outcomes.len() as u32 >= self.config.min_calls
                    && self.window.failure_rate() >= self.config.failure_rate_threshold
                {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(Instant::now());
                }
            }
            BreakerState::Open => {}
        }
    }
}

/// Named breaker registry. One instance is shared (`Arc`) across every
/// repository call site; breakers are created lazily with
/// [`BreakerConfig::default`] unless [`Self::configure`] was called first.
pub struct ParkingLotResilienceService {
    breakers: Mutex<HashMap<String, Breaker>>,
    configs: Mutex<HashMap<String, BreakerConfig>>,
}

impl Default for ParkingLotResilienceService {
    fn default() -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            configs: Mutex::new(HashMap::new()),
        }
    }
}

impl ParkingLotResilienceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a non-default [`BreakerConfig`] for `name` ahead of first
    /// use (`spec.md` §6 `circuit_breaker.<name>.*` configuration keys).
    pub fn configure(&self, name: impl Into<String>, config: BreakerConfig) {
        self.configs.lock().insert(name.into(), config);
    }

    fn config_for(&self, name: &str) -> BreakerConfig {
        self.configs.lock().get(name).copied().unwrap_or_default()
    }
}

impl ParkingLotResilienceService {
    pub fn state(&self, breaker_name: &str) -> BreakerState {
        let mut breakers = self.breakers.lock();
        let config = self.config_for(breaker_name);
        breakers.entry(breaker_name.to_string()).or_insert_with(|| Breaker::new(config)).state
    }

    /// Retries `op` (bounded exponential backoff, DESIGN.md open question
    /// (c)) before the breaker counts the call as exactly one
    /// success/failure in its sliding window.
    pub async fn execute<F, Fut, T>(
        &self,
        breaker_name: &str,
        op: F,
        fallback: impl FnOnce() -> T + Send,
    ) -> Result<T, IngestionError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, IngestionError>> + Send,
        T: Send,
    {
        let config = {
            let mut breakers = self.breakers.lock();
            let breaker = breakers
                .entry(breaker_name.to_string())
                .or_insert_with(|| Breaker::new(self.config_for(breaker_name)));
            if !breaker.permits_call() {
                return Ok(fallback());
            }
            breaker.config
        };

        let outcome = tokio::time::timeout(config.call_timeout, retry::retry_with_backoff(op)).await;

        let result = match outcome {
            Ok(Ok(value)) => {
                self.breakers.lock().get_mut(breaker_name).expect("inserted above").record_outcome(true);
                return Ok(value);
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(IngestionError::Timeout(format!("'{breaker_name}' call exceeded {:?}", config.call_timeout))),
        };

        self.breakers.lock().get_mut(breaker_name).expect("inserted above").record_outcome(false);
        result
    }
}

// `ResilienceService`'s `execute` is generic (`spec.md` §9 note: kept out
// of `dyn`-compatibility on purpose), so it is used via `Arc<ParkingLotResilienceService>`
// everywhere rather than `Arc<dyn ResilienceService>`. This inherent-method
// duplicate of the trait lets call sites write `resilience.execute(...)`
// without importing the trait, while the trait impl below still lets
// generic code write `R: ResilienceService`.
#[async_trait]
impl ingestion_domain::services::ResilienceService for ParkingLotResilienceService {
    fn state(&self, breaker_name: &str) -> BreakerState {
        ParkingLotResilienceService::state(self, breaker_name)
    }

    async fn execute<F, Fut, T>(&self, breaker_name: &str, op: F, fallback: impl FnOnce() -> T + Send) -> Result<T, IngestionError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, IngestionError>> + Send,
        T: Send,
    {
        ParkingLotResilienceService::execute(self, breaker_name, op, fallback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config() -> BreakerConfig {
        BreakerConfig::new(50, 4, 2, Duration::from_millis(50), 2, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn opens_after_failure_rate_threshold_breached() {
        let svc = ParkingLotResilienceService::new();
        svc.configure("repository", fast_config());
        for _ in 0..4 {
            let _ = svc
                .execute("repository", || async { Err::<(), _>(IngestionError::persistence("boom")) }, || ())
                .await;
        }
        assert_eq!(svc.state("repository"), BreakerState::Open);
    }

    #[tokio::test]
    async fn open_breaker_never_invokes_the_wrapped_operation() {
        let svc = ParkingLotResilienceService::new();
        svc.configure("repository", fast_config());
        for _ in 0..4 {
            let _ = svc
                .execute("repository", || async { Err::<(), _>(IngestionError::persistence("boom")) }, || ())
                .await;
        }
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result = svc
            .execute(
                "repository",
                move || {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, IngestionError>(1u32) }
                },
                || 42u32,
            )
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn half_open_closes_after_required_successes() {
        let svc = ParkingLotResilienceService::new();
        svc.configure("repository", fast_config());
        for _ in 0..4 {
            let _ = svc
                .execute("repository", || async { Err::<(), _>(IngestionError::persistence("boom")) }, || ())
                .await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        for _ in 0..2 {
            let _ = svc.execute("repository", || async { Ok::<_, IngestionError>(()) }, || ()).await;
        }
        assert_eq!(svc.state("repository"), BreakerState::Closed);
    }
}
