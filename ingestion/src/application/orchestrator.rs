// /////////////////////////////////////////////////////////////////////////////
// XML Ingestion Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pipeline orchestrator (C10, `spec.md` §4.10): drives one `MessageEnvelope`
//! through interface lookup, parse, validate, strategy, and persistence, and
//! folds every failure into a terminal `ProcessedFile` status instead of
//! propagating it to the worker pool (§4.10, §7).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, warn};

use ingestion_domain::aggregates::DocumentAggregate;
use ingestion_domain::entities::{DocumentHeader, DocumentLine, Interface, MessageEnvelope, ProcessedFile};
use ingestion_domain::error::IngestionError;
use ingestion_domain::events::{IngestionEvent, IngestionObserver};
use ingestion_domain::repositories::{
    HeaderRepository, InterfaceRepository, LineRepository, MappingRuleRepository, ProcessedFileRepository, ProcessedFileUpdate,
};
use ingestion_domain::services::document_processing_strategy::StrategyFactory;
use ingestion_domain::services::xml_processor_service::XmlProcessorService;
use ingestion_domain::services::SchemaValidatorService;
use ingestion_domain::value_objects::{HeaderId, InterfaceId, ProcessedFileStatus};

/// No-op [`IngestionObserver`], used when the composition root wires no
/// external listener. Keeps the orchestrator's observer field infallible to
/// construct instead of `Option<Arc<dyn IngestionObserver>>` scattered with
/// `if let Some`.
struct NoopObserver;
#[async_trait::async_trait]
impl IngestionObserver for NoopObserver {}

use crate::infrastructure::batching::AdaptiveBatchSizer;
use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::resilience::ParkingLotResilienceService;

/// Name of the shared breaker guarding every repository call (`spec.md`
/// §6 `circuit_breaker.<name>.*`; repository I/O is the one dependency
/// every document touches, so it gets its own named breaker).
const REPOSITORY_BREAKER: &str = "repository";

/// Marker written into a header's `status` field when a create is served
/// from the breaker's fallback instead of the repository (`spec.md` §4.7,
/// S4). Distinguishes "not persisted, breaker open" from a real write.
const CIRCUIT_OPEN_STATUS: &str = "ERROR - Circuit breaker open";

/// Outcome of one `process` call, reported to the worker pool purely for
/// metrics/logging — every outcome here is terminal and gets acked
/// (`spec.md` §4.10 step 7, §7: "error outcomes are terminal; no broker
/// requeue").
#[derive(Debug)]
pub enum Outcome {
    Success,
    Error(IngestionError),
}

/// Wires every C1-C9 port together and runs one document end to end. Holds
/// no per-message state — safe to share (`Arc`) across every worker task.
pub struct PipelineOrchestrator {
    interfaces: Arc<dyn InterfaceRepository>,
    processed_files: Arc<dyn ProcessedFileRepository>,
    headers: Arc<dyn HeaderRepository>,
    lines: Arc<dyn LineRepository>,
    mapping_rules: Arc<dyn MappingRuleRepository>,
    xml: Arc<dyn XmlProcessorService>,
    schema: Arc<dyn SchemaValidatorService>,
    strategies: Arc<dyn StrategyFactory>,
    resilience: Arc<ParkingLotResilienceService>,
    batch_sizer: Arc<AdaptiveBatchSizer>,
    metrics: Arc<MetricsService>,
    observer: Arc<dyn IngestionObserver>,
}

#[allow(clippy::too_many_arguments)]
impl PipelineOrchestrator {
    pub fn new(
        interfaces: Arc<dyn InterfaceRepository>,
        processed_files: Arc<dyn ProcessedFileRepository>,
        headers: Arc<dyn HeaderRepository>,
        lines: Arc<dyn LineRepository>,
        mapping_rules: Arc<dyn MappingRuleRepository>,
        xml: Arc<dyn XmlProcessorService>,
        schema: Arc<dyn SchemaValidatorService>,
        strategies: Arc<dyn StrategyFactory>,
        resilience: Arc<ParkingLotResilienceService>,
        batch_sizer: Arc<AdaptiveBatchSizer>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self::with_observer(
            interfaces,
            processed_files,
            headers,
            lines,
            mapping_rules,
            xml,
            schema,
            strategies,
            resilience,
            batch_sizer,
            metrics,
            Arc::new(NoopObserver),
        )
    }

    /// Same as [`Self::new`] but with an explicit [`IngestionObserver`] for
    /// callers that want to react to `FileAccepted`/`DocumentCommitted`/
    /// `FileRejected` (`spec.md` §4.10) — e.g. a metrics bridge or an
    /// admin-facing activity feed, both out of core scope but fed from here.
    #[allow(clippy::too_many_arguments)]
    pub fn with_observer(
        interfaces: Arc<dyn InterfaceRepository>,
        processed_files: Arc<dyn ProcessedFileRepository>,
        headers: Arc<dyn HeaderRepository>,
        lines: Arc<dyn LineRepository>,
        mapping_rules: Arc<dyn MappingRuleRepository>,
        xml: Arc<dyn XmlProcessorService>,
        schema: Arc<dyn SchemaValidatorService>,
        strategies: Arc<dyn StrategyFactory>,
        resilience: Arc<ParkingLotResilienceService>,
        batch_sizer: Arc<AdaptiveBatchSizer>,
        metrics: Arc<MetricsService>,
        observer: Arc<dyn IngestionObserver>,
    ) -> Self {
        Self {
            interfaces,
            processed_files,
            headers,
            lines,
            mapping_rules,
            xml,
            schema,
            strategies,
            resilience,
            batch_sizer,
            metrics,
            observer,
        }
    }

    /// Drives `envelope` through the pipeline end-to-end. Never returns an
    /// `Err` to the caller — every failure is folded into a terminal
    /// `ProcessedFile` status before this returns (`spec.md` §4.10, §7).
    pub async fn process(&self, envelope: MessageEnvelope) -> Outcome {
        let start = Instant::now();
        let outcome = self.process_inner(&envelope).await;
        self.metrics.record_processing_duration_seconds(start.elapsed().as_secs_f64());
        match &outcome {
            Outcome::Success => self.metrics.record_processed("SUCCESS"),
            Outcome::Error(_) => self.metrics.record_processed("ERROR"),
        }
        outcome
    }

    /// Same as [`Self::process`] but bounded by a 5-minute wall-clock
    /// timeout (`spec.md` §4.10). Returns `None` on timeout: the
    /// `ProcessedFile` is left `PROCESSING` since the in-flight attempt may
    /// still complete against the database after we give up waiting, and
    /// acknowledgment is manual on terminal status only (`spec.md` line
    /// 133) — a caller must not ack a message whose row never reached
    /// `SUCCESS`/`ERROR`.
    pub async fn process_with_timeout(&self, envelope: MessageEnvelope) -> Option<Outcome> {
        tokio::time::timeout(Duration::from_secs(300), self.process(envelope)).await.ok()
    }

    async fn process_inner(&self, envelope: &MessageEnvelope) -> Outcome {
        let interface = match self.interfaces.find_by_id(envelope.interface_id).await {
            Ok(Some(interface)) => interface,
            Ok(None) => {
                return Outcome::Error(IngestionError::configuration(format!("interface {} not found", envelope.interface_id)));
            }
            Err(err) => return Outcome::Error(err),
        };

        let processed_file = match self.find_or_create_processed_file(envelope).await {
            Ok(pf) => pf,
            Err(err) => return Outcome::Error(err),
        };

        // Already terminal: a prior attempt already resolved this
        // (file_name, interface_id) pair (`spec.md` §8 S5 idempotency).
        if processed_file.status().is_terminal() {
            return Outcome::Success;
        }

        self.observer
            .on_event(&IngestionEvent::FileAccepted {
                file_id: processed_file.id(),
                client_id: envelope.client_id,
                interface_id: envelope.interface_id,
                at: Utc::now(),
            })
            .await;

        match self.run_pipeline(envelope, &interface).await {
            Ok((canonical, header_id, line_count)) => {
                if let Err(err) = self.mark_terminal(processed_file.id(), ProcessedFileUpdate {
                    status: Some(ProcessedFileStatus::Success),
                    content: Some(canonical),
                    error_message: None,
                }).await {
                    error!(error = %err, "failed to record terminal SUCCESS status");
                    return Outcome::Error(err);
                }
                self.observer
                    .on_event(&IngestionEvent::DocumentCommitted { file_id: processed_file.id(), header_id, line_count, at: Utc::now() })
                    .await;
                Outcome::Success
            }
            Err(err) => {
                let message = err.to_string();
                if let Err(update_err) = self.mark_terminal(processed_file.id(), ProcessedFileUpdate {
                    status: Some(ProcessedFileStatus::Error),
                    content: None,
                    error_message: Some(message.clone()),
                }).await {
                    error!(error = %update_err, original_error = %err, "failed to record terminal ERROR status");
                }
                self.observer.on_event(&IngestionEvent::FileRejected { file_id: processed_file.id(), reason: message, at: Utc::now() }).await;
                Outcome::Error(err)
            }
        }
    }

    /// Records `ERROR(interrupted)` on `(file_name, interface_id)`'s latest
    /// row if it is still non-terminal (`spec.md` line 166: a forcibly
    /// cancelled worker must not leave a `PROCESSING` row behind). A no-op
    /// if the row already reached `SUCCESS`/`ERROR` by the time the caller
    /// gave up waiting, or if no row exists yet.
    pub async fn mark_interrupted(&self, file_name: &str, interface_id: InterfaceId) -> Result<(), IngestionError> {
        let Some(processed_file) = self.processed_files.find_latest(file_name, interface_id).await? else {
            return Ok(());
        };
        if processed_file.status().is_terminal() {
            return Ok(());
        }
        self.mark_terminal(
            processed_file.id(),
            ProcessedFileUpdate {
                status: Some(ProcessedFileStatus::Error),
                error_message: Some(IngestionError::Interrupted("graceful shutdown forced cancellation".to_string()).to_string()),
                content: None,
            },
        )
        .await
    }

    async fn find_or_create_processed_file(&self, envelope: &MessageEnvelope) -> Result<ProcessedFile, IngestionError> {
        if let Some(existing) = self.processed_files.find_latest(&envelope.file_name, envelope.interface_id).await? {
            return Ok(existing);
        }
        self.processed_files
            .create(ProcessedFile::new(envelope.file_name.clone(), envelope.client_id, envelope.interface_id))
            .await
    }

    /// Records the terminal status in its own call, independent of the
    /// strategy's persistence transaction (`spec.md` §5, §7: "the
    /// ProcessedFile update that records the error runs in a separate
    /// transaction so the outcome survives rollback").
    async fn mark_terminal(&self, id: ingestion_domain::value_objects::ProcessedFileId, fields: ProcessedFileUpdate) -> Result<(), IngestionError> {
        self.processed_files.update(id, fields).await.map(|_| ())
    }

    async fn run_pipeline(&self, envelope: &MessageEnvelope, interface: &Interface) -> Result<(Vec<u8>, HeaderId, usize), IngestionError> {
        let document = self.xml.parse(&envelope.file_bytes).await?;

        // Compatibility check (S3): a mismatched root short-circuits before
        // the full schema validator is ever invoked.
        let root = document.root();
        if root.local_name() != interface.root_element().local_name() || document.namespace() != interface.namespace() {
            return Err(IngestionError::validation(
                "root_element",
                format!(
                    "document root '{}' (namespace {:?}) does not match interface '{}' (expects '{}', namespace {:?})",
                    root.local_name(),
                    document.namespace(),
                    interface.name(),
                    interface.root_element().local_name(),
                    interface.namespace(),
                ),
            ));
        }

        let violations = self.schema.validate(document.as_ref(), interface.schema_path(), interface.root_element().is_flexible()).await?;
        if let Some(first) = violations.first() {
            return Err(IngestionError::validation(first.path.clone(), first.message.clone()));
        }

        let rules = self.mapping_rules.active_by_interface(interface.id()).await?;
        if rules.is_empty() {
            return Err(IngestionError::configuration(format!("no active mapping rules for interface {}", interface.id())));
        }

        let strategy = self.strategies.for_document_type(interface.document_type().as_str());
        let processed = strategy.process(document.as_ref(), interface, &rules).await?;

        // Enforces the cross-entity invariants (§3, §8 property 2-3) before
        // anything is persisted: one client, one header, no stray lines.
        let aggregate = DocumentAggregate::new(processed.header, processed.lines)?;
        let line_count = aggregate.line_count();
        let (header, lines) = aggregate.into_parts();

        let header = self.create_header(header).await?;
        let header_id = header.id();

        if !lines.is_empty() {
            let batch_size = self.batch_sizer.current().get() as usize;
            self.create_lines(lines, batch_size).await?;
        }

        let canonical = self.xml.serialize_canonical(document.as_ref()).await?;
        Ok((canonical, header_id, line_count))
    }

    /// Persists `header` through the shared repository breaker. On
    /// breaker-open the fallback returns a copy of `header` tagged with
    /// [`CIRCUIT_OPEN_STATUS`] instead of writing anything (`spec.md`
    /// §4.7) — detected here and turned into a proper
    /// [`IngestionError::CircuitOpen`] so the caller never mistakes it for
    /// a persisted row.
    async fn create_header(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError> {
        let fallback_header = header.clone();
        let headers = self.headers.clone();
        let result = self
            .resilience
            .execute(
                REPOSITORY_BREAKER,
                move || {
                    let headers = headers.clone();
                    let header = header.clone();
                    async move { headers.create(header).await }
                },
                move || with_circuit_open_status(fallback_header),
            )
            .await?;

        if is_circuit_open_marker(&result) {
            warn!(breaker = REPOSITORY_BREAKER, "header create served from breaker fallback, not persisted");
            return Err(IngestionError::CircuitOpen(REPOSITORY_BREAKER.to_string()));
        }
        Ok(result)
    }

    /// Persists `lines` through the shared repository breaker, chunked at
    /// `batch_size` (C9). Breaker-open is detected the same way as
    /// [`Self::create_header`]: since `lines` is non-empty on entry, an
    /// empty result can only mean the fallback ran.
    async fn create_lines(&self, lines: Vec<DocumentLine>, batch_size: usize) -> Result<Vec<DocumentLine>, IngestionError> {
        let expected = lines.len();
        let lines_repo = self.lines.clone();
        let result = self
            .resilience
            .execute(
                REPOSITORY_BREAKER,
                move || {
                    let lines_repo = lines_repo.clone();
                    let lines = lines.clone();
                    async move { lines_repo.create_batch(lines, batch_size).await }
                },
                Vec::new,
            )
            .await?;

        if result.is_empty() && expected > 0 {
            warn!(breaker = REPOSITORY_BREAKER, "line batch served from breaker fallback, not persisted");
            return Err(IngestionError::CircuitOpen(REPOSITORY_BREAKER.to_string()));
        }
        Ok(result)
    }
}

fn with_circuit_open_status(header: DocumentHeader) -> DocumentHeader {
    match header {
        DocumentHeader::Asn(mut h) => {
            h.status = CIRCUIT_OPEN_STATUS.to_string();
            DocumentHeader::Asn(h)
        }
        DocumentHeader::Order(mut h) => {
            h.status = CIRCUIT_OPEN_STATUS.to_string();
            DocumentHeader::Order(h)
        }
    }
}

fn is_circuit_open_marker(header: &DocumentHeader) -> bool {
    match header {
        DocumentHeader::Asn(h) => h.status == CIRCUIT_OPEN_STATUS,
        DocumentHeader::Order(h) => h.status == CIRCUIT_OPEN_STATUS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingestion_domain::entities::{AsnHeader, MappingRule};
    use ingestion_domain::services::{BreakerConfig, SchemaViolation};
    use ingestion_domain::value_objects::{ClientId, DataType, DocumentType, HeaderId, InterfaceId, ProcessedFileId, TargetLevel};
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::infrastructure::batching::BatchSizerConfig;
    use crate::infrastructure::strategies::HashMapStrategyFactory;
    use crate::infrastructure::transform::StringTransformationService;
    use crate::infrastructure::xml::LibxmlProcessorService;

    struct FakeInterfaces(Interface);
    #[async_trait]
    impl InterfaceRepository for FakeInterfaces {
        async fn find_by_id(&self, _id: InterfaceId) -> Result<Option<Interface>, IngestionError> {
            Ok(Some(self.0.clone()))
        }
    }

    #[derive(Default)]
    struct FakeProcessedFiles(Mutex<HashMap<ProcessedFileId, ProcessedFile>>);
    #[async_trait]
    impl ProcessedFileRepository for FakeProcessedFiles {
        async fn create(&self, file: ProcessedFile) -> Result<ProcessedFile, IngestionError> {
            self.0.lock().unwrap().insert(file.id(), file.clone());
            Ok(file)
        }
        async fn update(&self, id: ProcessedFileId, fields: ProcessedFileUpdate) -> Result<ProcessedFile, IngestionError> {
            let mut guard = self.0.lock().unwrap();
            let file = guard.get_mut(&id).expect("row exists");
            if let Some(status) = fields.status {
                match status {
                    ProcessedFileStatus::Success => file.mark_success(fields.content.unwrap_or_default(), Utc::now())?,
                    ProcessedFileStatus::Error => file.mark_error(fields.error_message.unwrap_or_default(), Utc::now())?,
                    ProcessedFileStatus::Processing => {}
                }
            }
            Ok(file.clone())
        }
        async fn find_latest(&self, _file_name: &str, _interface_id: InterfaceId) -> Result<Option<ProcessedFile>, IngestionError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct FakeHeaders(Mutex<Vec<DocumentHeader>>);
    #[async_trait]
    impl HeaderRepository for FakeHeaders {
        async fn create(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError> {
            self.0.lock().unwrap().push(header.clone());
            Ok(header)
        }
        async fn update(&self, header: DocumentHeader) -> Result<DocumentHeader, IngestionError> {
            Ok(header)
        }
        async fn delete(&self, _id: HeaderId) -> Result<(), IngestionError> {
            Ok(())
        }
        async fn find_by_id(&self, _id: HeaderId) -> Result<Option<DocumentHeader>, IngestionError> {
            Ok(None)
        }
        async fn find_by_client(&self, _client_id: ClientId, _page: u32, _page_size: u32) -> Result<Vec<DocumentHeader>, IngestionError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeLines(Mutex<Vec<DocumentLine>>);
    #[async_trait]
    impl LineRepository for FakeLines {
        async fn create_batch(&self, lines: Vec<DocumentLine>, _batch_size: usize) -> Result<Vec<DocumentLine>, IngestionError> {
            self.0.lock().unwrap().extend(lines.iter().cloned());
            Ok(lines)
        }
        async fn find_by_header(&self, _header_id: HeaderId) -> Result<Vec<DocumentLine>, IngestionError> {
            Ok(vec![])
        }
        async fn delete(&self, _id: ingestion_domain::value_objects::DocumentLineId) -> Result<(), IngestionError> {
            Ok(())
        }
        async fn delete_by_header(&self, _header_id: HeaderId) -> Result<(), IngestionError> {
            Ok(())
        }
    }

    struct FakeMappingRules(Vec<MappingRule>);
    #[async_trait]
    impl MappingRuleRepository for FakeMappingRules {
        async fn active_by_interface(&self, _interface_id: InterfaceId) -> Result<Vec<MappingRule>, IngestionError> {
            Ok(self.0.clone())
        }
        async fn by_client_interface_table(&self, _client_id: ClientId, _interface_id: InterfaceId, _table_name: &str) -> Result<Vec<MappingRule>, IngestionError> {
            Ok(self.0.clone())
        }
    }

    struct AlwaysValidSchema;
    #[async_trait]
    impl SchemaValidatorService for AlwaysValidSchema {
        async fn validate(&self, _document: &dyn ingestion_domain::services::xml_processor_service::ParsedDocument, _schema_path: &str, _flexible: bool) -> Result<Vec<SchemaViolation>, IngestionError> {
            Ok(vec![])
        }
        async fn warm_schema(&self, _schema_path: &str) -> Result<(), IngestionError> {
            Ok(())
        }
    }

    fn make_orchestrator(interface: Interface, rules: Vec<MappingRule>) -> (PipelineOrchestrator, Arc<FakeHeaders>, Arc<FakeLines>, Arc<FakeProcessedFiles>) {
        let headers = Arc::new(FakeHeaders::default());
        let lines = Arc::new(FakeLines::default());
        let processed_files = Arc::new(FakeProcessedFiles::default());

        let xml: Arc<dyn XmlProcessorService> = Arc::new(LibxmlProcessorService::new());
        let transform: Arc<dyn ingestion_domain::services::TransformationService> = Arc::new(StringTransformationService::new());
        let mut factory = HashMapStrategyFactory::new(Arc::new(crate::infrastructure::strategies::AsnStrategy::new(xml.clone(), transform.clone())));
        factory.register(Arc::new(crate::infrastructure::strategies::OrderStrategy::new(xml.clone(), transform)));

        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FakeInterfaces(interface)),
            processed_files.clone(),
            headers.clone(),
            lines.clone(),
            Arc::new(FakeMappingRules(rules)),
            xml,
            Arc::new(AlwaysValidSchema),
            Arc::new(factory),
            Arc::new(ParkingLotResilienceService::new()),
            AdaptiveBatchSizer::new(BatchSizerConfig::default()),
            Arc::new(MetricsService::new().unwrap()),
        );
        (orchestrator, headers, lines, processed_files)
    }

    fn asn_rule(client: ClientId, iface: InterfaceId, source: &str, target: &str, level: TargetLevel, table: &str, required: bool) -> MappingRule {
        MappingRule::new(client, iface, target, source, target, level, table, DataType::String, 1).unwrap().required(required)
    }

    #[tokio::test]
    async fn s1_full_document_persists_header_and_lines_and_succeeds() {
        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);
        let rules = vec![
            asn_rule(client, iface_id, "/ASN/AsnNumber", "asn_number", TargetLevel::Header, "ASN_HEADERS", true),
            asn_rule(client, iface_id, "ItemNumber", "item_number", TargetLevel::Line, "ASN_LINES", true),
        ];
        let (orchestrator, headers, lines, processed_files) = make_orchestrator(interface, rules);

        let body = b"<ASN><AsnNumber>ASN-1</AsnNumber>\
            <ASN_LINE><ItemNumber>I-1</ItemNumber></ASN_LINE>\
            <ASN_LINE><ItemNumber>I-2</ItemNumber></ASN_LINE>\
            <ASN_LINE><ItemNumber>I-3</ItemNumber></ASN_LINE>\
            <ASN_LINE><ItemNumber>I-4</ItemNumber></ASN_LINE>\
            <ASN_LINE><ItemNumber>I-5</ItemNumber></ASN_LINE></ASN>"
            .to_vec();
        let envelope = MessageEnvelope::new(body, "asn-1.xml", client, iface_id, ingestion_domain::value_objects::Priority::Normal);

        let outcome = orchestrator.process(envelope).await;
        assert!(matches!(outcome, Outcome::Success));
        assert_eq!(headers.0.lock().unwrap().len(), 1);
        assert_eq!(lines.0.lock().unwrap().len(), 5);
        assert_eq!(processed_files.0.lock().unwrap().len(), 1);
        let file = processed_files.0.lock().unwrap().values().next().unwrap().clone();
        assert!(matches!(file.status(), ProcessedFileStatus::Success));
    }

    #[tokio::test]
    async fn s2_required_line_field_missing_rolls_back_header_and_lines() {
        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);
        let rules = vec![
            asn_rule(client, iface_id, "/ASN/AsnNumber", "asn_number", TargetLevel::Header, "ASN_HEADERS", true),
            asn_rule(client, iface_id, "ItemNumber", "item_number", TargetLevel::Line, "ASN_LINES", true),
        ];
        let (orchestrator, headers, lines, processed_files) = make_orchestrator(interface, rules);

        let body = b"<ASN><AsnNumber>ASN-1</AsnNumber>\
            <ASN_LINE><ItemNumber>I-1</ItemNumber></ASN_LINE>\
            <ASN_LINE><ItemNumber>I-2</ItemNumber></ASN_LINE>\
            <ASN_LINE></ASN_LINE></ASN>"
            .to_vec();
        let envelope = MessageEnvelope::new(body, "asn-2.xml", client, iface_id, ingestion_domain::value_objects::Priority::Normal);

        let outcome = orchestrator.process(envelope).await;
        assert!(matches!(outcome, Outcome::Error(_)));
        assert!(headers.0.lock().unwrap().is_empty());
        assert!(lines.0.lock().unwrap().is_empty());
        let file = processed_files.0.lock().unwrap().values().next().unwrap().clone();
        assert!(matches!(file.status(), ProcessedFileStatus::Error));
        assert!(file.error_message().unwrap().contains("item_number"));
    }

    #[tokio::test]
    async fn s3_wrong_root_element_fails_before_schema_validation() {
        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);
        let (orchestrator, headers, _lines, processed_files) = make_orchestrator(interface, vec![]);

        let body = b"<PURCHASE_ORDER><OrderNumber>PO-1</OrderNumber></PURCHASE_ORDER>".to_vec();
        let envelope = MessageEnvelope::new(body, "wrong-root.xml", client, iface_id, ingestion_domain::value_objects::Priority::Normal);

        let outcome = orchestrator.process(envelope).await;
        assert!(matches!(outcome, Outcome::Error(_)));
        assert!(headers.0.lock().unwrap().is_empty());
        let file = processed_files.0.lock().unwrap().values().next().unwrap().clone();
        assert!(matches!(file.status(), ProcessedFileStatus::Error));
    }

    #[tokio::test]
    async fn s4_circuit_breaker_open_skips_persistence_and_acks_with_error() {
        let client = ClientId::new();
        let iface_id = InterfaceId::new();
        let interface = Interface::new(client, "inbound-asn", DocumentType::new("ASN"), "ASN", None, "/schemas/asn.xsd", 0);
        let rules = vec![asn_rule(client, iface_id, "/ASN/AsnNumber", "asn_number", TargetLevel::Header, "ASN_HEADERS", true)];

        let headers = Arc::new(FakeHeaders::default());
        let lines = Arc::new(FakeLines::default());
        let processed_files = Arc::new(FakeProcessedFiles::default());
        let xml: Arc<dyn XmlProcessorService> = Arc::new(LibxmlProcessorService::new());
        let transform: Arc<dyn ingestion_domain::services::TransformationService> = Arc::new(StringTransformationService::new());
        let mut factory = HashMapStrategyFactory::new(Arc::new(crate::infrastructure::strategies::AsnStrategy::new(xml.clone(), transform.clone())));
        factory.register(Arc::new(crate::infrastructure::strategies::OrderStrategy::new(xml.clone(), transform)));

        let resilience = Arc::new(ParkingLotResilienceService::new());
        resilience.configure(REPOSITORY_BREAKER, BreakerConfig::new(50, 2, 1, Duration::from_secs(30), 2, Duration::from_secs(5)));
        // Force the breaker open before the message arrives.
        let _ = resilience.execute(REPOSITORY_BREAKER, || async { Err::<(), _>(IngestionError::persistence("boom")) }, || ()).await;
        let _ = resilience.execute(REPOSITORY_BREAKER, || async { Err::<(), _>(IngestionError::persistence("boom")) }, || ()).await;
        assert_eq!(resilience.state(REPOSITORY_BREAKER), ingestion_domain::services::BreakerState::Open);

        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FakeInterfaces(interface)),
            processed_files.clone(),
            headers.clone(),
            lines.clone(),
            Arc::new(FakeMappingRules(rules)),
            xml,
            Arc::new(AlwaysValidSchema),
            Arc::new(factory),
            resilience,
            AdaptiveBatchSizer::new(BatchSizerConfig::default()),
            Arc::new(MetricsService::new().unwrap()),
        );

        let body = b"<ASN><AsnNumber>ASN-1</AsnNumber></ASN>".to_vec();
        let envelope = MessageEnvelope::new(body, "s4.xml", client, iface_id, ingestion_domain::value_objects::Priority::Normal);

        let outcome = orchestrator.process(envelope).await;
        assert!(matches!(outcome, Outcome::Error(IngestionError::CircuitOpen(_))));
        assert!(headers.0.lock().unwrap().is_empty());
        let file = processed_files.0.lock().unwrap().values().next().unwrap().clone();
        assert!(matches!(file.status(), ProcessedFileStatus::Error));
    }

    #[test]
    fn circuit_open_marker_round_trips() {
        let header = DocumentHeader::Asn(AsnHeader::new_default(ClientId::new(), InterfaceId::new()));
        let tagged = with_circuit_open_status(header);
        assert!(is_circuit_open_marker(&tagged));
    }
}
