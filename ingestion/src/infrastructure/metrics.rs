// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Prometheus metrics for pipeline observability (ambient stack, not a
//! `spec.md` component). The admin HTTP API that would scrape
//! [`MetricsService::get_metrics`] is explicitly out of core scope
//! (`spec.md` §6), but the ingestion worker still exposes the numbers.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};

use ingestion_domain::error::IngestionError;

#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,

    processed_files_total: IntCounterVec,
    document_processing_duration: Histogram,
    batch_size_current: IntGauge,
    queue_depth: IntGaugeVec,
    breaker_state: IntGaugeVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, IngestionError> {
        let registry = Registry::new();

        let processed_files_total = IntCounterVec::new(
            Opts::new("processed_files_total", "Total ProcessedFile rows reaching a terminal status").namespace("ingestion"),
            &["status"],
        )
        .map_err(metrics_error)?;

        let document_processing_duration = Histogram::with_opts(
            HistogramOpts::new("document_processing_duration_seconds", "Time spent in the pipeline orchestrator per message")
                .namespace("ingestion")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
        )
        .map_err(metrics_error)?;

        let batch_size_current = IntGauge::with_opts(Opts::new("batch_size_current", "Current adaptive line-insertion batch size").namespace("ingestion"))
            .map_err(metrics_error)?;

        let queue_depth = IntGaugeVec::new(
            Opts::new("queue_depth", "Last observed message count per priority queue").namespace("ingestion"),
            &["priority"],
        )
        .map_err(metrics_error)?;

        let breaker_state = IntGaugeVec::new(
            Opts::new("circuit_breaker_state", "0=closed 1=half_open 2=open").namespace("ingestion"),
            &["breaker"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(processed_files_total.clone())).map_err(metrics_error)?;
        registry.register(Box::new(document_processing_duration.clone())).map_err(metrics_error)?;
        registry.register(Box::new(batch_size_current.clone())).map_err(metrics_error)?;
        registry.register(Box::new(queue_depth.clone())).map_err(metrics_error)?;
        registry.register(Box::new(breaker_state.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry: Arc::new(registry),
            processed_files_total,
            document_processing_duration,
            batch_size_current,
            queue_depth,
            breaker_state,
        })
    }

    pub fn record_processed(&self, status: &str) {
        self.processed_files_total.with_label_values(&[status]).inc();
    }

    pub fn record_processing_duration_seconds(&self, seconds: f64) {
        self.document_processing_duration.observe(seconds);
    }

    pub fn set_batch_size(&self, size: u32) {
        self.batch_size_current.set(size as i64);
    }

    pub fn set_queue_depth(&self, priority: &str, depth: u64) {
        self.queue_depth.with_label_values(&[priority]).set(depth as i64);
    }

    pub fn set_breaker_state(&self, breaker: &str, state: ingestion_domain::services::BreakerState) {
        let value = match state {
            ingestion_domain::services::BreakerState::Closed => 0,
            ingestion_domain::services::BreakerState::HalfOpen => 1,
            ingestion_domain::services::BreakerState::Open => 2,
        };
        self.breaker_state.with_label_values(&[breaker]).set(value);
    }

    pub fn get_metrics(&self) -> Result<String, IngestionError> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).map_err(metrics_error)
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new().expect("metric descriptors are static and always valid")
    }
}

fn metrics_error(e: impl std::fmt::Display) -> IngestionError {
    IngestionError::configuration(format!("metrics: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_registered_metric_names() {
        let svc = MetricsService::new().unwrap();
        svc.record_processed("SUCCESS");
        svc.set_batch_size(120);
        let text = svc.get_metrics().unwrap();
        assert!(text.contains("ingestion_processed_files_total"));
        assert!(text.contains("ingestion_batch_size_current"));
    }
}
