//! Copy orchestrator
//!
//! [`InMemoryDataCopier`] drives one job's export into its import, one
//! page at a time:
//!
//! 1. take the cursor on top of the [`Worklist`]
//! 2. export that page (with retries)
//! 3. import the page's data, if any (with retries, through the idempotent executor)
//! 4. add the page's counts and bytes to the job
//! 5. push the next page and any discovered containers, then persist the worklist
//!
//! Iterations are strictly sequential because each one depends on the
//! continuation produced by the previous one. Cancellation is checked at
//! the top of every iteration.
//!
//! # Example
//!
//! ```rust,no_run
//! use porter::adapters::local::{LocalExporter, LocalImporter};
//! use porter::adapters::metrics::LoggingMetricRecorder;
//! use porter::adapters::store::InMemoryJobStore;
//! use porter::adapters::traits::AuthData;
//! use porter::config::TransferConfig;
//! use porter::core::copier::InMemoryDataCopier;
//! use porter::core::retry::{RetryStrategyLibrary, SystemClock};
//! use porter::domain::{DataVertical, ServiceId, TransferJob};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let local = ServiceId::new("local")?;
//! let job = TransferJob::new(DataVertical::Photos, local.clone(), local);
//! let copier = InMemoryDataCopier::new(
//!     &job,
//!     Arc::new(LocalExporter::new("/data/in", DataVertical::Photos, 100)),
//!     Arc::new(LocalImporter::new("/data/out", &TransferConfig::default())),
//!     Arc::new(InMemoryJobStore::new()),
//!     Arc::new(LoggingMetricRecorder::new()),
//!     Arc::new(RetryStrategyLibrary::default()),
//!     Arc::new(SystemClock),
//! );
//!
//! let report = copier.copy(job.id, &AuthData::none(), &AuthData::none(), None).await?;
//! println!("{} iterations", report.iterations);
//! # Ok(())
//! # }
//! ```

pub mod callables;
pub mod worklist;

pub use callables::{CallableExporter, CallableImporter};
pub use worklist::Worklist;

use crate::adapters::metrics::MetricRecorder;
use crate::adapters::store::JobStore;
use crate::adapters::traits::{AuthData, Exporter, Importer};
use crate::core::idempotent::IdempotentImportExecutor;
use crate::core::retry::{Clock, RetryStrategyLibrary, RetryingCallable};
use crate::domain::{
    CopyError, CopyResult, DataVertical, ErrorDetail, ExportInformation, ImportResult, JobId,
    JobState, RetryError, ServiceId, Stage, TransferJob,
};
use crate::{log_copy_iteration, log_store_failure};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Summary of one `copy` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyReport {
    /// Iterations started
    pub iterations: usize,

    /// Pages exported, retries not counted
    pub export_calls: usize,

    /// Pages imported, retries not counted
    pub import_calls: usize,

    /// Pages given up on under a skip strategy
    pub skipped_pages: usize,

    /// Item-level errors recorded by the idempotent executor
    pub item_errors: Vec<ErrorDetail>,
}

/// Drives one job's export into its import
pub struct InMemoryDataCopier {
    exporter: CallableExporter,
    importer: CallableImporter,
    executor: IdempotentImportExecutor,
    store: Arc<dyn JobStore>,
    metrics: Arc<dyn MetricRecorder>,
    data_type: DataVertical,
    export_service: ServiceId,
    import_service: ServiceId,
    shutdown: Option<watch::Receiver<bool>>,
}

impl InMemoryDataCopier {
    /// Creates a copier for `job`'s data type and services
    pub fn new(
        job: &TransferJob,
        exporter: Arc<dyn Exporter>,
        importer: Arc<dyn Importer>,
        store: Arc<dyn JobStore>,
        metrics: Arc<dyn MetricRecorder>,
        library: Arc<RetryStrategyLibrary>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let export_retry = RetryingCallable::new(
            library.clone(),
            clock.clone(),
            job.data_type,
            job.export_service.clone(),
        );
        let import_retry =
            RetryingCallable::new(library, clock, job.data_type, job.import_service.clone());

        Self {
            exporter: CallableExporter::new(exporter, export_retry, metrics.clone(), job.data_type),
            importer: CallableImporter::new(importer, import_retry, metrics.clone(), job.data_type),
            executor: IdempotentImportExecutor::new(store.clone()),
            store,
            metrics,
            data_type: job.data_type,
            export_service: job.export_service.clone(),
            import_service: job.import_service.clone(),
            shutdown: None,
        }
    }

    /// Stops the copy at the next iteration boundary once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// The idempotent executor this copier imports through
    pub fn executor(&self) -> &IdempotentImportExecutor {
        &self.executor
    }

    /// Copies everything reachable from `export_info`
    ///
    /// When the job has a persisted worklist, the copy resumes from it and
    /// `export_info` is ignored.
    ///
    /// # Errors
    ///
    /// - [`CopyError::Fatal`] for job-fatal export or import failures
    /// - [`CopyError::RetriesExhausted`] when a page keeps failing
    /// - [`CopyError::Cancelled`] when the job was cancelled between iterations
    /// - [`CopyError::Store`] when the job store cannot be read at start
    pub async fn copy(
        &self,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
        export_info: Option<ExportInformation>,
    ) -> CopyResult<CopyReport> {
        let started = Instant::now();
        self.executor.bind_job(job_id).await.map_err(CopyError::Store)?;

        let mut worklist = match Worklist::load(self.store.as_ref(), job_id)
            .await
            .map_err(CopyError::Store)?
        {
            Some(saved) if !saved.is_empty() => {
                tracing::info!(job_id = %job_id, pending = saved.len(), "Resuming from persisted worklist");
                saved
            }
            _ => Worklist::new(export_info),
        };

        let mut report = CopyReport::default();
        let outcome = self
            .run(job_id, export_auth, import_auth, &mut worklist, &mut report)
            .await;

        let success = outcome.is_ok();
        let elapsed = started.elapsed();
        self.metrics
            .export_finished(self.data_type, &self.export_service, success, elapsed);
        self.metrics
            .import_finished(self.data_type, &self.import_service, success, elapsed);

        report.item_errors = self.executor.errors();
        tracing::info!(
            job_id = %job_id,
            success = success,
            iterations = report.iterations,
            export_calls = report.export_calls,
            import_calls = report.import_calls,
            item_errors = report.item_errors.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Copy finished"
        );

        outcome.map(|()| report)
    }

    async fn run(
        &self,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
        worklist: &mut Worklist,
        report: &mut CopyReport,
    ) -> CopyResult<()> {
        while let Some(cursor) = worklist.peek().cloned() {
            if self.is_cancelled(job_id).await {
                tracing::warn!(job_id = %job_id, iterations = report.iterations, "Copy cancelled");
                return Err(CopyError::Cancelled {
                    iterations: report.iterations,
                });
            }

            report.iterations += 1;
            let iteration = report.iterations;

            log_copy_iteration!(job_id, iteration, "started export");
            let export_started = Instant::now();
            let exported = self.exporter.call(job_id, export_auth, &cursor).await;
            report.export_calls += 1;
            self.metrics.export_page_finished(
                self.data_type,
                &self.export_service,
                exported.is_ok(),
                export_started.elapsed(),
            );
            log_copy_iteration!(job_id, iteration, "finished export");

            let export_result = match exported {
                Ok(result) => result,
                Err(e) if e.can_skip => {
                    self.skip_page(job_id, Stage::Export, &cursor, &e).await;
                    report.skipped_pages += 1;
                    worklist.advance(None);
                    self.persist(job_id, worklist).await;
                    continue;
                }
                Err(e) => return Err(CopyError::from_retry(Stage::Export, e)),
            };

            if let Some(page) = export_result.data_to_import() {
                log_copy_iteration!(job_id, iteration, "started import");
                let import_started = Instant::now();
                let imported = self
                    .importer
                    .call(job_id, &self.executor, import_auth, page)
                    .await;
                report.import_calls += 1;
                self.metrics.import_page_finished(
                    self.data_type,
                    &self.import_service,
                    imported.is_ok(),
                    import_started.elapsed(),
                );
                log_copy_iteration!(job_id, iteration, "finished import");

                match imported {
                    Ok(result) => self.record_aggregates(job_id, &result).await,
                    Err(e) if e.can_skip => {
                        self.skip_page(job_id, Stage::Import, &cursor, &e).await;
                        report.skipped_pages += 1;
                    }
                    Err(e) => return Err(CopyError::from_retry(Stage::Import, e)),
                }
            }

            worklist.advance(export_result.next_work());
            self.persist(job_id, worklist).await;
        }

        if let Err(e) = Worklist::clear(self.store.as_ref(), job_id).await {
            log_store_failure!(job_id, e, "clear worklist");
        }
        Ok(())
    }

    async fn is_cancelled(&self, job_id: JobId) -> bool {
        if let Some(shutdown) = &self.shutdown {
            if *shutdown.borrow() {
                return true;
            }
        }
        match self.store.find_job(job_id).await {
            Ok(Some(job)) => job.state == JobState::Canceled,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Unable to check job state");
                false
            }
        }
    }

    async fn record_aggregates(&self, job_id: JobId, result: &ImportResult) {
        if let Some(counts) = result.counts.as_ref().filter(|c| !c.is_empty()) {
            if let Err(e) = self.store.add_counts(job_id, counts).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record item counts");
            }
        }
        if let Some(bytes) = result.bytes.filter(|b| *b > 0) {
            if let Err(e) = self.store.add_bytes(job_id, bytes).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to record bytes");
            }
        }
    }

    async fn skip_page(
        &self,
        job_id: JobId,
        stage: Stage,
        cursor: &ExportInformation,
        error: &RetryError,
    ) {
        let page = cursor.label();
        let detail = ErrorDetail::new(
            format!("{stage}:{page}"),
            format!("{stage} of page {page}"),
            &error.source,
        )
        .skippable(true);

        tracing::warn!(
            job_id = %job_id,
            stage = %stage,
            page = %page,
            attempts = error.attempts,
            error = %error.source,
            "Skipping page"
        );
        if let Err(e) = self.store.add_errors_to_job(job_id, &[detail]).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to record skipped page");
        }
    }

    async fn persist(&self, job_id: JobId, worklist: &Worklist) {
        if let Err(e) = worklist.save(self.store.as_ref(), job_id).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to persist worklist");
        }
    }
}
