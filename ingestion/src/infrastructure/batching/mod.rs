// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Adaptive batch sizer (C9, `spec.md` §4.9). A single atomic integer in
//! `[min, max]`, tuned on a 30s timer (or after each batch commit) from
//! queue depth, recent CPU load, and observed per-item persist latency.
//! Per DESIGN.md open question (a), the same value is also published as
//! the worker pool's (C8) per-consumer prefetch count via [`watch`].

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;
use tokio::sync::watch;
use tracing::{debug, info};

use ingestion_domain::value_objects::BatchSize;

/// Queue depth from the bus's management interface (`spec.md` §4.9). A
/// trait rather than a concrete lapin call so the sizer can be unit-tested
/// without a broker.
#[async_trait]
pub trait QueueDepthSource: Send + Sync {
    async fn total_queue_depth(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct BatchSizerConfig {
    pub min: u32,
    pub max: u32,
    pub step: u32,
    pub queue_depth_threshold: u64,
    /// System load above which the sizer shrinks regardless of queue depth.
    pub load_high: f64,
    /// System load below which growth is permitted when queue depth is high.
    pub load_low: f64,
    pub tick_interval: Duration,
}

impl Default for BatchSizerConfig {
    fn default() -> Self {
        Self {
            min: BatchSize::MIN,
            max: BatchSize::MAX,
            step: BatchSize::DEFAULT_STEP,
            queue_depth_threshold: 1000,
            load_high: 0.8,
            load_low: 0.7,
            tick_interval: Duration::from_secs(30),
        }
    }
}

/// Rolling average of persist latency, tracked as a sum/count pair that
/// resets on every read (`spec.md` §4.9 "observed average per-item persist
/// time"). Plain atomics, not a mutex: the sizer only needs an approximate
/// recent average, not exact history.
#[derive(Default)]
struct PersistLatency {
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl PersistLatency {
    fn record(&self, elapsed: Duration) {
        self.sum_micros.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Drains the accumulated samples and returns their mean, if any were
    /// recorded since the last call.
    fn take_average(&self) -> Option<Duration> {
        let count = self.count.swap(0, Ordering::Relaxed);
        let sum = self.sum_micros.swap(0, Ordering::Relaxed);
        if count == 0 {
            None
        } else {
            Some(Duration::from_micros(sum / count))
        }
    }
}

pub struct AdaptiveBatchSizer {
    config: BatchSizerConfig,
    current: AtomicU32,
    latency: PersistLatency,
    publisher: watch::Sender<u32>,
}

impl AdaptiveBatchSizer {
    pub fn new(config: BatchSizerConfig) -> Arc<Self> {
        let (publisher, _) = watch::channel(BatchSize::initial().get());
        Arc::new(Self {
            config,
            current: AtomicU32::new(BatchSize::initial().get()),
            latency: PersistLatency::default(),
            publisher,
        })
    }

    pub fn current(&self) -> BatchSize {
        BatchSize::new(self.current.load(Ordering::Relaxed), self.config.min, self.config.max)
    }

    /// A [`watch::Receiver`] that observes every adjustment, for the worker
    /// pool to re-derive its per-consumer prefetch count from.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.publisher.subscribe()
    }

    pub fn record_persist_duration(&self, elapsed: Duration) {
        self.latency.record(elapsed);
    }

    /// One adjustment step (`spec.md` §4.9 decision table), applied and
    /// published. Returns the new size.
    pub fn adjust(&self, queue_depth: u64, system_load: f64) -> BatchSize {
        let grow_from_queue = queue_depth > self.config.queue_depth_threshold && system_load < self.config.load_low;
        let shrink_from_queue = queue_depth < self.config.queue_depth_threshold / 2;

        let avg_persist = self.latency.take_average();
        let grow_from_latency = avg_persist.map(|d| d < Duration::from_millis(10)).unwrap_or(false);
        // CPU load above the high-water mark forces shrinkage regardless of
        // anything else (`spec.md` §4.9 ¶2: "> load_threshold CPU forces
        // shrinkage") — this outranks both the queue-depth signal and a fast
        // observed persist latency. Below that, a fast persist latency is
        // itself a growth signal and wins over a merely-low queue depth, so
        // a quiet-but-fast system still grows instead of shrinking.
        let forced_shrink = system_load > self.config.load_high;

        let direction = if forced_shrink {
            -1
        } else if grow_from_latency {
            1
        } else if shrink_from_queue {
            -1
        } else if grow_from_queue {
            1
        } else {
            0
        };

        let current = self.current();
        let next = match direction {
            1 => current.saturating_increment(self.config.step, self.config.max),
            -1 => current.saturating_decrement(self.config.step, self.config.min),
            _ => current,
        };

        if next != current {
            debug!(queue_depth, system_load, from = current.get(), to = next.get(), "adaptive batch size adjusted");
        }
        self.current.store(next.get(), Ordering::Relaxed);
        let _ = self.publisher.send(next.get());
        next
    }

    /// Spawns the 30s timer task (`spec.md` §4.9, §5: "a dedicated timer
    /// task"). Runs until the process exits; there is no explicit shutdown
    /// handle because the sizer holds no resources worth draining.
    pub fn spawn(self: Arc<Self>, queue_depth: Arc<dyn QueueDepthSource>) {
        let mut system = System::new();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            loop {
                interval.tick().await;
                system.refresh_cpu_usage();
                let load = (system.global_cpu_usage() / 100.0) as f64;
                let depth = queue_depth.total_queue_depth().await;
                let size = self.adjust(depth, load);
                info!(batch_size = size.get(), queue_depth = depth, system_load = load, "batch sizer tick");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_on_high_queue_depth_and_low_load() {
        let sizer = AdaptiveBatchSizer::new(BatchSizerConfig::default());
        let before = sizer.current();
        let after = sizer.adjust(5000, 0.5);
        assert_eq!(after.get(), before.saturating_increment(BatchSize::DEFAULT_STEP, BatchSize::MAX).get());
    }

    #[test]
    fn shrinks_on_high_system_load() {
        let sizer = AdaptiveBatchSizer::new(BatchSizerConfig::default());
        let before = sizer.current();
        let after = sizer.adjust(5000, 0.9);
        assert_eq!(after.get(), before.saturating_decrement(BatchSize::DEFAULT_STEP, BatchSize::MIN).get());
    }

    #[test]
    fn unchanged_in_the_comfortable_middle() {
        let sizer = AdaptiveBatchSizer::new(BatchSizerConfig::default());
        let before = sizer.current();
        let after = sizer.adjust(500, 0.75);
        assert_eq!(after, before);
    }

    #[test]
    fn never_crosses_bounds() {
        let sizer = AdaptiveBatchSizer::new(BatchSizerConfig {
            min: 10,
            max: 20,
            step: 100,
            ..BatchSizerConfig::default()
        });
        let after = sizer.adjust(5000, 0.1);
        assert_eq!(after.get(), 20);
        let after = sizer.adjust(0, 0.95);
        assert_eq!(after.get(), 10);
    }

    #[test]
    fn fast_persistence_encourages_growth_even_at_low_queue_depth() {
        let sizer = AdaptiveBatchSizer::new(BatchSizerConfig::default());
        sizer.record_persist_duration(Duration::from_millis(2));
        let before = sizer.current();
        let after = sizer.adjust(100, 0.5);
        assert_eq!(after.get(), before.saturating_increment(BatchSize::DEFAULT_STEP, BatchSize::MAX).get());
    }
}
