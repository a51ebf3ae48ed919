// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Dependency injection: the one place that knows every concrete adapter
//! behind `ingestion_domain`'s ports (`spec.md` §9 "no thread-local state;
//! all shared state is atomic" - wiring it all up is the one place that is
//! allowed to know every concrete type).

use std::sync::Arc;

use ingestion::application::PipelineOrchestrator;
use ingestion::infrastructure::batching::AdaptiveBatchSizer;
use ingestion::infrastructure::config::AppConfig;
use ingestion::infrastructure::metrics::MetricsService;
use ingestion::infrastructure::repositories::{
    connect, SqliteHeaderRepository, SqliteInterfaceRepository, SqliteLineRepository, SqliteMappingRuleRepository,
    SqliteProcessedFileRepository,
};
use ingestion::infrastructure::resilience::ParkingLotResilienceService;
use ingestion::infrastructure::strategies::{AsnStrategy, HashMapStrategyFactory, OrderStrategy};
use ingestion::infrastructure::transform::StringTransformationService;
use ingestion::infrastructure::worker_pool::{WorkerPool, WorkerPoolConfig};
use ingestion::infrastructure::xml::LibxmlProcessorService;
use ingestion_domain::error::IngestionError;
use ingestion_domain::services::document_processing_strategy::{DocumentProcessingStrategy, StrategyFactory};

/// Everything a command needs after configuration is loaded. Holds no
/// per-request state; every field is an `Arc` shared across worker tasks
/// (`spec.md` §5).
pub struct AppContext {
    pub config: AppConfig,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub batch_sizer: Arc<AdaptiveBatchSizer>,
    pub worker_pool_config: WorkerPoolConfig,
    amqp_pool: deadpool_lapin::Pool,
    metrics: Arc<MetricsService>,
}

impl AppContext {
    /// Loads configuration, opens the database and AMQP pools, and wires
    /// every C1-C9 port to its concrete adapter. Called exactly once per
    /// process, from `main`.
    pub async fn build(run_env: Option<&str>) -> Result<Self, IngestionError> {
        let config = AppConfig::load(run_env)?;

        let db_pool = connect(&config.database.url, config.database.max_connections).await?;

        let amqp_cfg = deadpool_lapin::Config { url: Some(config.rabbitmq.url.clone()), ..Default::default() };
        let amqp_pool = amqp_cfg
            .create_pool(Some(deadpool_lapin::Runtime::Tokio1))
            .map_err(|e| IngestionError::configuration(format!("failed to build AMQP pool: {e}")))?;

        let interfaces = Arc::new(SqliteInterfaceRepository::new(db_pool.clone()));
        let processed_files = Arc::new(SqliteProcessedFileRepository::new(db_pool.clone()));
        let headers = Arc::new(SqliteHeaderRepository::new(db_pool.clone()));
        let lines = Arc::new(SqliteLineRepository::new(db_pool.clone()));
        let mapping_rules = Arc::new(SqliteMappingRuleRepository::new(db_pool.clone()));

        let xml = Arc::new(LibxmlProcessorService::new());
        let schema = Arc::new(ingestion::infrastructure::schema::LibxmlSchemaValidatorService::new());
        let transform = Arc::new(StringTransformationService::new());

        let asn_strategy: Arc<dyn DocumentProcessingStrategy> = Arc::new(AsnStrategy::new(xml.clone(), transform.clone()));
        let order_strategy: Arc<dyn DocumentProcessingStrategy> = Arc::new(OrderStrategy::new(xml.clone(), transform.clone()));
        // ASN is the factory's default: `spec.md` §4.6 "On unknown type,
        // factory returns a configured default."
        let mut strategy_factory = HashMapStrategyFactory::new(asn_strategy.clone());
        strategy_factory.register(asn_strategy);
        strategy_factory.register(order_strategy);
        let strategies: Arc<dyn StrategyFactory> = Arc::new(strategy_factory);

        let resilience = Arc::new(ParkingLotResilienceService::new());
        for (name, breaker_config) in config.breaker_configs() {
            resilience.configure(name, breaker_config);
        }

        let batch_sizer = AdaptiveBatchSizer::new(config.batch_sizer_config());
        let metrics = Arc::new(MetricsService::new()?);

        let orchestrator = Arc::new(PipelineOrchestrator::new(
            interfaces,
            processed_files,
            headers,
            lines,
            mapping_rules,
            xml,
            schema,
            strategies,
            resilience,
            batch_sizer.clone(),
            metrics.clone(),
        ));

        Ok(Self { worker_pool_config: config.worker_pool_config(), config, orchestrator, batch_sizer, amqp_pool, metrics })
    }

    /// Builds the worker pool and starts the batch sizer's timer task
    /// feeding off the pool's own queue-depth observation
    /// (`DESIGN.md` open question (a)).
    pub fn worker_pool(&self) -> Arc<WorkerPool> {
        let pool = WorkerPool::new(
            self.amqp_pool.clone(),
            self.worker_pool_config.clone(),
            self.orchestrator.clone(),
            self.batch_sizer.clone(),
            self.metrics.clone(),
        );
        self.batch_sizer.clone().spawn(pool.clone());
        pool
    }
}
