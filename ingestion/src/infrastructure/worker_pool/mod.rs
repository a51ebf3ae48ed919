// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Worker pool + priority queues (C8, `spec.md` §4.8). Consumes from three
//! durable queues (`high`/`normal`/`low`) bound to one direct exchange by
//! routing key, draining `high` before `normal` before `low` whenever a
//! worker is free (`spec.md` §8 property 6) via a `tokio::select!` with
//! `biased` branch order. Elastic: starts `concurrent` workers, grows up to
//! `max_concurrent` under backlog, shrinks back down never below
//! `concurrent`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_lapin::Pool;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Consumer, ExchangeKind};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use ingestion_domain::entities::MessageEnvelope;
use ingestion_domain::error::IngestionError;
use ingestion_domain::value_objects::{InterfaceId, Priority};

use crate::application::PipelineOrchestrator;
use crate::infrastructure::batching::{AdaptiveBatchSizer, QueueDepthSource};
use crate::infrastructure::metrics::MetricsService;

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Direct exchange every priority queue binds to.
    pub exchange: String,
    /// Base queue name; the three priority queues are
    /// `{queue_prefix}.{high,normal,low}` (`spec.md` §6
    /// `rabbitmq.queue.inbound.processor`).
    pub queue_prefix: String,
    /// `rabbitmq.concurrent.consumers`.
    pub concurrent: usize,
    /// `rabbitmq.max.concurrent.consumers`.
    pub max_concurrent: usize,
    pub prefetch_min: u16,
    pub prefetch_max: u16,
    /// Queue backlog above which the pool grows past `concurrent`.
    pub grow_queue_depth_threshold: u64,
    pub shutdown_grace: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            exchange: "ingestion.inbound".to_string(),
            queue_prefix: "ingestion.inbound".to_string(),
            concurrent: 4,
            max_concurrent: 16,
            prefetch_min: 10,
            prefetch_max: 250,
            grow_queue_depth_threshold: 1000,
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

fn lapin_err(err: lapin::Error) -> IngestionError {
    IngestionError::persistence(format!("rabbitmq: {err}"))
}

fn pool_err(err: deadpool_lapin::PoolError) -> IngestionError {
    IngestionError::configuration(format!("rabbitmq connection pool: {err}"))
}

/// Elastic consumer pool driving one [`PipelineOrchestrator`] per delivered
/// message. Holds no per-message state outside the brief window a delivery
/// is in flight, tracked in `in_flight` purely so a forced shutdown can
/// record `ERROR(interrupted)` for whatever a worker was doing when it was
/// aborted (`spec.md` line 166).
pub struct WorkerPool {
    pool: Pool,
    config: WorkerPoolConfig,
    orchestrator: Arc<PipelineOrchestrator>,
    batch_sizer: Arc<AdaptiveBatchSizer>,
    metrics: Arc<MetricsService>,
    workers: AsyncMutex<JoinSet<()>>,
    active_workers: AtomicUsize,
    next_worker_id: AtomicUsize,
    in_flight: SyncMutex<HashMap<usize, (String, InterfaceId)>>,
}

impl WorkerPool {
    pub fn new(
        pool: Pool,
        config: WorkerPoolConfig,
        orchestrator: Arc<PipelineOrchestrator>,
        batch_sizer: Arc<AdaptiveBatchSizer>,
        metrics: Arc<MetricsService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            config,
            orchestrator,
            batch_sizer,
            metrics,
            workers: AsyncMutex::new(JoinSet::new()),
            active_workers: AtomicUsize::new(0),
            next_worker_id: AtomicUsize::new(0),
            in_flight: SyncMutex::new(HashMap::new()),
        })
    }

    fn queue_name(&self, priority: Priority) -> String {
        format!("{}.{}", self.config.queue_prefix, priority.routing_key())
    }

    fn clamp_prefetch(&self, value: u32) -> u16 {
        value.clamp(self.config.prefetch_min as u32, self.config.prefetch_max as u32) as u16
    }

    async fn declare_topology(&self) -> Result<(), IngestionError> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let channel = conn.create_channel().await.map_err(lapin_err)?;
        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(lapin_err)?;

        for priority in Priority::ALL_BY_DRAIN_ORDER {
            let queue = self.queue_name(priority);
            channel
                .queue_declare(&queue, QueueDeclareOptions { durable: true, ..Default::default() }, FieldTable::default())
                .await
                .map_err(lapin_err)?;
            channel
                .queue_bind(&queue, &self.config.exchange, priority.routing_key(), QueueBindOptions::default(), FieldTable::default())
                .await
                .map_err(lapin_err)?;
        }
        Ok(())
    }

    /// Runs until `shutdown` reports `true`, then drains in-flight work for
    /// `shutdown_grace` before force-aborting whatever remains.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Result<(), IngestionError> {
        self.declare_topology().await?;

        for _ in 0..self.config.concurrent {
            self.spawn_worker(shutdown.clone()).await;
        }

        let elastic = self.clone();
        let mut elastic_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if *elastic_shutdown.borrow() {
                            break;
                        }
                        elastic.maybe_grow(elastic_shutdown.clone()).await;
                    }
                    _ = elastic_shutdown.changed() => {
                        if *elastic_shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        let mut shutdown_wait = shutdown;
        while !*shutdown_wait.borrow() {
            if shutdown_wait.changed().await.is_err() {
                break;
            }
        }

        info!(grace = ?self.config.shutdown_grace, "worker pool shutdown signaled, draining in-flight deliveries");
        let drained_in_time = {
            let mut set = self.workers.lock().await;
            let wait_all = async {
                while set.join_next().await.is_some() {}
            };
            tokio::time::timeout(self.config.shutdown_grace, wait_all).await.is_err()
        };

        if drained_in_time {
            warn!("shutdown grace period elapsed, aborting remaining in-flight workers");
            let mut set = self.workers.lock().await;
            set.abort_all();
            while set.join_next().await.is_some() {}

            let stragglers: Vec<(String, InterfaceId)> = self.in_flight.lock().drain().map(|(_, v)| v).collect();
            for (file_name, interface_id) in stragglers {
                if let Err(err) = self.orchestrator.mark_interrupted(&file_name, interface_id).await {
                    error!(file_name, error = %err, "failed to record interrupted status after forced shutdown");
                }
            }
        }

        Ok(())
    }

    async fn spawn_worker(self: &Arc<Self>, shutdown: watch::Receiver<bool>) {
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
        let this = self.clone();
        self.workers.lock().await.spawn(async move {
            let mut shutdown = shutdown;
            if let Err(err) = this.worker_loop(worker_id, &mut shutdown).await {
                error!(worker_id, error = %err, "worker loop exited with an error");
            }
        });
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    async fn maybe_grow(self: &Arc<Self>, shutdown: watch::Receiver<bool>) {
        if self.active_workers.load(Ordering::SeqCst) >= self.config.max_concurrent {
            return;
        }
        match self.total_queue_depth_checked().await {
            Ok(depth) if depth > self.config.grow_queue_depth_threshold => {
                info!(depth, "queue backlog above threshold, growing worker pool");
                self.spawn_worker(shutdown).await;
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "failed to sample queue depth for elastic growth"),
        }
    }

    async fn total_queue_depth_checked(&self) -> Result<u64, IngestionError> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let channel = conn.create_channel().await.map_err(lapin_err)?;
        let mut total = 0u64;
        for priority in Priority::ALL_BY_DRAIN_ORDER {
            let queue = channel
                .queue_declare(&self.queue_name(priority), QueueDeclareOptions { passive: true, ..Default::default() }, FieldTable::default())
                .await
                .map_err(lapin_err)?;
            let depth = queue.message_count() as u64;
            self.metrics.set_queue_depth(priority.routing_key(), depth);
            total += depth;
        }
        Ok(total)
    }

    async fn consume(&self, channel: &Channel, priority: Priority, worker_id: usize) -> Result<Consumer, IngestionError> {
        channel
            .basic_consume(
                &self.queue_name(priority),
                &format!("worker-{worker_id}-{}", priority.routing_key()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(lapin_err)
    }

    async fn worker_loop(&self, worker_id: usize, shutdown: &mut watch::Receiver<bool>) -> Result<(), IngestionError> {
        let conn = self.pool.get().await.map_err(pool_err)?;
        let channel = conn.create_channel().await.map_err(lapin_err)?;
        channel
            .basic_qos(self.clamp_prefetch(self.batch_sizer.current().get()), BasicQosOptions::default())
            .await
            .map_err(lapin_err)?;

        let mut high = self.consume(&channel, Priority::High, worker_id).await?;
        let mut normal = self.consume(&channel, Priority::Normal, worker_id).await?;
        let mut low = self.consume(&channel, Priority::Low, worker_id).await?;
        let mut batch_rx = self.batch_sizer.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                Ok(()) = batch_rx.changed() => {
                    let prefetch = self.clamp_prefetch(*batch_rx.borrow());
                    if let Err(err) = channel.basic_qos(prefetch, BasicQosOptions::default()).await {
                        warn!(worker_id, error = %err, "failed to update consumer prefetch");
                    }
                }
                delivery = high.next() => {
                    self.handle_delivery(worker_id, delivery).await;
                }
                delivery = normal.next() => {
                    self.handle_delivery(worker_id, delivery).await;
                }
                delivery = low.next() => {
                    self.handle_delivery(worker_id, delivery).await;
                }
            }
        }

        Ok(())
    }

    async fn handle_delivery(&self, worker_id: usize, delivery: Option<Result<lapin::message::Delivery, lapin::Error>>) {
        let delivery = match delivery {
            Some(Ok(delivery)) => delivery,
            Some(Err(err)) => {
                error!(worker_id, error = %err, "consumer stream error");
                return;
            }
            None => return,
        };

        let envelope: MessageEnvelope = match serde_json::from_slice(&delivery.data) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(worker_id, error = %err, "malformed message envelope, dropping");
                if let Err(ack_err) = delivery.ack(BasicAckOptions::default()).await {
                    error!(worker_id, error = %ack_err, "failed to ack malformed delivery");
                }
                return;
            }
        };

        self.in_flight.lock().insert(worker_id, (envelope.file_name.clone(), envelope.interface_id));
        let outcome = self.orchestrator.process_with_timeout(envelope).await;
        self.in_flight.lock().remove(&worker_id);

        match outcome {
            Some(_) => {
                // Ack on every terminal outcome, success or error
                // (`spec.md` line 133): the failure is already durably
                // recorded on the ProcessedFile row, so the broker must
                // not redeliver it.
                if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                    error!(worker_id, error = %err, "failed to ack terminal message");
                }
            }
            None => {
                warn!(worker_id, "pipeline exceeded its wall-clock timeout, leaving delivery unacked for redelivery");
            }
        }
    }
}

#[async_trait]
impl QueueDepthSource for WorkerPool {
    async fn total_queue_depth(&self) -> u64 {
        self.total_queue_depth_checked().await.unwrap_or(0)
    }
}
