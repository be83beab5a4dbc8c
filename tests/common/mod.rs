//! Shared fixtures for the integration tests
//!
//! `ScriptedExporter` replays canned export results per cursor and
//! `RecordingImporter` creates every item through the idempotent executor
//! while counting the side effects it actually performed.

#![allow(dead_code)]

use async_trait::async_trait;
use porter::adapters::metrics::MetricRecorder;
use porter::adapters::store::{InMemoryJobStore, JobStore};
use porter::adapters::traits::{AuthData, Exporter, Importer};
use porter::core::copier::InMemoryDataCopier;
use porter::core::idempotent::IdempotentImportExecutor;
use porter::core::retry::{RecordingClock, RetryStrategy, RetryStrategyLibrary};
use porter::domain::{
    ContinuationToken, DataItem, DataPage, DataVertical, ExportInformation, ExportResult,
    ImportResult, ItemCounts, JobId, Result, ServiceId, TransferError, TransferJob,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Key for a cursor: `<container|root>/<token|start>`
pub fn cursor_key(info: Option<&ExportInformation>) -> String {
    let container = info
        .and_then(|i| i.container.as_ref())
        .map_or("root".to_string(), |c| c.id.clone());
    let page = match info.and_then(|i| i.page.as_ref()) {
        None => "start".to_string(),
        Some(ContinuationToken::Token(t)) => t.clone(),
        Some(ContinuationToken::Offset(o)) => o.to_string(),
        Some(ContinuationToken::Structured(v)) => v.to_string(),
    };
    format!("{container}/{page}")
}

/// Exporter answering each cursor from a queue of canned results
#[derive(Default)]
pub struct ScriptedExporter {
    script: Mutex<HashMap<String, VecDeque<Result<ExportResult>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `result` for the cursor identified by `key`
    pub fn on(self, key: &str, result: Result<ExportResult>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Cursor keys in the order they were exported, retries included
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exporter for ScriptedExporter {
    async fn export(
        &self,
        _job_id: JobId,
        _auth: &AuthData,
        export_info: Option<&ExportInformation>,
    ) -> Result<ExportResult> {
        let key = cursor_key(export_info);
        self.calls.lock().unwrap().push(key.clone());

        let mut script = self.script.lock().unwrap();
        let queue = script
            .get_mut(&key)
            .ok_or_else(|| TransferError::Other(format!("unexpected cursor {key}")))?;
        match queue.len() {
            0 => Err(TransferError::Other(format!("script exhausted for {key}"))),
            // The last entry keeps answering
            1 => clone_result(&queue[0]),
            _ => queue.pop_front().unwrap(),
        }
    }
}

fn clone_result(result: &Result<ExportResult>) -> Result<ExportResult> {
    match result {
        Ok(r) => Ok(r.clone()),
        Err(e) => Err(e.clone()),
    }
}

/// Importer that creates each item once through the executor
#[derive(Default)]
pub struct RecordingImporter {
    created: Mutex<Vec<String>>,
    pages: Mutex<usize>,
    failures: Mutex<VecDeque<TransferError>>,
    item_failures: Mutex<HashMap<String, TransferError>>,
}

impl RecordingImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next import calls with these errors, in order
    pub fn failing_with(self, errors: Vec<TransferError>) -> Self {
        self.failures.lock().unwrap().extend(errors);
        self
    }

    /// Fails every creation of `item_id`
    pub fn failing_item(self, item_id: &str, error: TransferError) -> Self {
        self.item_failures
            .lock()
            .unwrap()
            .insert(item_id.to_string(), error);
        self
    }

    /// Item ids in the order their side effect ran
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    /// Import calls, retries included
    pub fn page_calls(&self) -> usize {
        *self.pages.lock().unwrap()
    }
}

#[async_trait]
impl Importer for RecordingImporter {
    async fn import_page(
        &self,
        _job_id: JobId,
        executor: &IdempotentImportExecutor,
        _auth: &AuthData,
        page: &DataPage,
    ) -> Result<ImportResult> {
        *self.pages.lock().unwrap() += 1;
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut counts = ItemCounts::new();
        let mut bytes = 0;
        for item in &page.items {
            let failure = self.item_failures.lock().unwrap().get(&item.id).cloned();
            let created_log = &self.created;
            let id = item.id.clone();
            let created = executor
                .execute_and_swallow_io_errors(&item.id, &item.title, || async move {
                    if let Some(error) = failure {
                        return Err(error);
                    }
                    created_log.lock().unwrap().push(id.clone());
                    Ok(id)
                })
                .await?;
            if created.is_some() {
                *counts.entry(item.kind.clone()).or_default() += 1;
                bytes += item.size_bytes.unwrap_or(0);
            }
        }

        Ok(ImportResult::ok().with_counts(counts).with_bytes(bytes))
    }
}

pub fn service(name: &str) -> ServiceId {
    ServiceId::new(name).unwrap()
}

pub fn job(data_type: DataVertical) -> TransferJob {
    TransferJob::new(data_type, service("source"), service("destination"))
}

pub fn items(kind: &str, ids: &[&str]) -> DataPage {
    DataPage::from_items(
        ids.iter()
            .map(|id| DataItem::new(*id, format!("{kind} {id}"), kind))
            .collect(),
    )
}

pub fn sized_items(kind: &str, items: &[(&str, u64)]) -> DataPage {
    DataPage::from_items(
        items
            .iter()
            .map(|(id, size)| DataItem::new(*id, format!("{kind} {id}"), kind).with_size(*size))
            .collect(),
    )
}

/// Library with the default curve, for tests that never fail
pub fn default_library() -> Arc<RetryStrategyLibrary> {
    Arc::new(RetryStrategyLibrary::uniform(RetryStrategy::default()))
}

/// Recorder that keeps every event name with its success flag
#[derive(Default)]
pub struct CountingMetricRecorder {
    events: Mutex<Vec<(&'static str, bool)>>,
}

impl CountingMetricRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Success flags of every `event`, in order
    pub fn outcomes(&self, event: &str) -> Vec<bool> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == event)
            .map(|(_, success)| *success)
            .collect()
    }

    fn record(&self, event: &'static str, success: bool) {
        self.events.lock().unwrap().push((event, success));
    }
}

impl MetricRecorder for CountingMetricRecorder {
    fn started_job(&self, _: DataVertical, _: &ServiceId, _: &ServiceId) {
        self.record("started_job", true);
    }

    fn export_page_attempt_finished(&self, _: DataVertical, _: &ServiceId, success: bool, _: Duration) {
        self.record("export_page_attempt_finished", success);
    }

    fn export_page_finished(&self, _: DataVertical, _: &ServiceId, success: bool, _: Duration) {
        self.record("export_page_finished", success);
    }

    fn import_page_attempt_finished(&self, _: DataVertical, _: &ServiceId, success: bool, _: Duration) {
        self.record("import_page_attempt_finished", success);
    }

    fn import_page_finished(&self, _: DataVertical, _: &ServiceId, success: bool, _: Duration) {
        self.record("import_page_finished", success);
    }

    fn export_finished(&self, _: DataVertical, _: &ServiceId, success: bool, _: Duration) {
        self.record("export_finished", success);
    }

    fn import_finished(&self, _: DataVertical, _: &ServiceId, success: bool, _: Duration) {
        self.record("import_finished", success);
    }

    fn finished_job(&self, _: DataVertical, _: &ServiceId, _: &ServiceId, success: bool, _: Duration) {
        self.record("finished_job", success);
    }

    fn cancelled_job(&self, _: DataVertical, _: &ServiceId, _: &ServiceId, _: Duration) {
        self.record("cancelled_job", true);
    }
}

pub struct Harness {
    pub store: Arc<InMemoryJobStore>,
    pub clock: Arc<RecordingClock>,
    pub metrics: Arc<CountingMetricRecorder>,
    pub job: TransferJob,
}

impl Harness {
    pub async fn new(data_type: DataVertical) -> Self {
        let store = Arc::new(InMemoryJobStore::new());
        let job = job(data_type);
        store.create_job(&job).await.unwrap();
        Self {
            store,
            clock: Arc::new(RecordingClock::new()),
            metrics: Arc::new(CountingMetricRecorder::new()),
            job,
        }
    }

    pub fn copier(
        &self,
        exporter: Arc<ScriptedExporter>,
        importer: Arc<RecordingImporter>,
        library: Arc<RetryStrategyLibrary>,
    ) -> InMemoryDataCopier {
        InMemoryDataCopier::new(
            &self.job,
            exporter,
            importer,
            self.store.clone(),
            self.metrics.clone(),
            library,
            self.clock.clone(),
        )
    }
}
