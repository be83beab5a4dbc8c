//! Job lifecycle
//!
//! [`JobRunner`] takes a stored [`TransferJob`] through one copy: resolve
//! its adapters, mark it in progress, run the copier, attach the item
//! errors, and record the terminal state.

use crate::adapters::metrics::MetricRecorder;
use crate::adapters::registry::{AdapterContext, AdapterRegistry};
use crate::adapters::store::JobStore;
use crate::adapters::traits::{AuthData, Exporter, Importer};
use crate::config::TransferConfig;
use crate::core::copier::InMemoryDataCopier;
use crate::core::retry::{Clock, RetryStrategyLibrary};
use crate::domain::{
    CopyError, FailureReason, JobId, JobProgress, JobState, Result, TransferError, TransferJob,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// How a job run ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Everything was copied
    Succeeded { progress: JobProgress },

    /// The copy completed but the job still lists errors
    ///
    /// Every listed error names an item or page missing at the destination.
    /// That includes errors with `can_skip == false` left by an earlier
    /// failed run whose items the resumed copy did not reach again.
    SucceededWithSkippedItems { progress: JobProgress },

    /// A job-fatal error stopped the copy
    Failed {
        reason: FailureReason,
        message: String,
        progress: JobProgress,
    },

    /// Cancelled by an operator or a shutdown signal
    Cancelled { progress: JobProgress },
}

impl JobOutcome {
    /// Aggregates at the end of the run
    pub fn progress(&self) -> &JobProgress {
        match self {
            Self::Succeeded { progress }
            | Self::SucceededWithSkippedItems { progress }
            | Self::Failed { progress, .. }
            | Self::Cancelled { progress } => progress,
        }
    }

    /// True for both success variants
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::SucceededWithSkippedItems { .. })
    }
}

/// Runs stored jobs
pub struct JobRunner {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn JobStore>,
    metrics: Arc<dyn MetricRecorder>,
    library: Arc<RetryStrategyLibrary>,
    clock: Arc<dyn Clock>,
    transfer: TransferConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

impl JobRunner {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        store: Arc<dyn JobStore>,
        metrics: Arc<dyn MetricRecorder>,
        library: Arc<RetryStrategyLibrary>,
        clock: Arc<dyn Clock>,
        transfer: TransferConfig,
    ) -> Self {
        Self {
            registry,
            store,
            metrics,
            library,
            clock,
            transfer,
            shutdown: None,
        }
    }

    /// Passes a shutdown signal to every copier this runner starts
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn resolve(&self, job: &TransferJob) -> Result<(Arc<dyn Exporter>, Arc<dyn Importer>)> {
        let ctx = AdapterContext {
            job_id: job.id,
            data_type: job.data_type,
            transfer: self.transfer.clone(),
        };
        let exporter = self.registry.exporter(&job.export_service, &ctx)?;
        let importer = self.registry.importer(&job.import_service, &ctx)?;
        Ok((exporter, importer))
    }

    /// Runs one job to a terminal state
    ///
    /// Jobs in `New` or `InProgress` state start or resume; a job in
    /// `Error` state resumes from its persisted worklist, e.g. after
    /// re-authorization.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist, is already complete or
    /// cancelled, or the job store fails. Copy failures are reported as
    /// [`JobOutcome::Failed`], not as errors.
    pub async fn run(
        &self,
        job_id: JobId,
        export_auth: &AuthData,
        import_auth: &AuthData,
    ) -> Result<JobOutcome> {
        let mut job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| TransferError::NotFound(format!("Job {job_id} does not exist")))?;

        if matches!(job.state, JobState::Complete | JobState::Canceled) {
            return Err(TransferError::Configuration(format!(
                "Job {job_id} is already {:?}",
                job.state
            )));
        }

        let started = Instant::now();
        let (exporter, importer) = match self.resolve(&job) {
            Ok(pair) => pair,
            Err(e) => {
                let reason = e.failure_reason().unwrap_or(FailureReason::Unsupported);
                tracing::error!(job_id = %job_id, error = %e, "Unable to resolve adapters");
                job.mark_failed(reason);
                self.store.update_job(&job).await?;
                return Ok(JobOutcome::Failed {
                    reason,
                    message: e.to_string(),
                    progress: self.store.job_progress(job_id).await?,
                });
            }
        };

        job.mark_in_progress();
        self.store.update_job(&job).await?;
        self.metrics
            .started_job(job.data_type, &job.export_service, &job.import_service);
        tracing::info!(
            job_id = %job_id,
            data_type = %job.data_type,
            export_service = %job.export_service,
            import_service = %job.import_service,
            "Job started"
        );

        let mut copier = InMemoryDataCopier::new(
            &job,
            exporter,
            importer,
            self.store.clone(),
            self.metrics.clone(),
            self.library.clone(),
            self.clock.clone(),
        );
        if let Some(shutdown) = &self.shutdown {
            copier = copier.with_shutdown(shutdown.clone());
        }

        let copied = copier
            .copy(job_id, export_auth, import_auth, job.export_information.clone())
            .await;

        let item_errors = copier.executor().errors();
        if !item_errors.is_empty() {
            if let Err(e) = self.store.add_errors_to_job(job_id, &item_errors).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to attach item errors");
            }
        }

        // Reload so a cancellation written while the copy ran is not overwritten
        let mut job = self.store.find_job(job_id).await?.unwrap_or(job);
        let elapsed = started.elapsed();

        let outcome = match copied {
            Ok(_) => {
                job.mark_complete();
                self.store.update_job(&job).await?;
                self.metrics.finished_job(
                    job.data_type,
                    &job.export_service,
                    &job.import_service,
                    true,
                    elapsed,
                );
                let progress = self.store.job_progress(job_id).await?;
                let unskippable = progress.unskippable_errors().count();
                if unskippable > 0 {
                    tracing::warn!(
                        job_id = %job_id,
                        errors = unskippable,
                        "Job finished with errors from an earlier run"
                    );
                }
                if progress.errors.is_empty() {
                    JobOutcome::Succeeded { progress }
                } else {
                    JobOutcome::SucceededWithSkippedItems { progress }
                }
            }
            Err(CopyError::Cancelled { iterations }) => {
                tracing::warn!(job_id = %job_id, iterations = iterations, "Job cancelled");
                job.mark_canceled();
                self.store.update_job(&job).await?;
                self.metrics.cancelled_job(
                    job.data_type,
                    &job.export_service,
                    &job.import_service,
                    elapsed,
                );
                JobOutcome::Cancelled {
                    progress: self.store.job_progress(job_id).await?,
                }
            }
            Err(e) => {
                let reason = e.failure_reason();
                tracing::error!(job_id = %job_id, reason = %reason, error = %e, "Job failed");
                job.mark_failed(reason);
                self.store.update_job(&job).await?;
                self.metrics.finished_job(
                    job.data_type,
                    &job.export_service,
                    &job.import_service,
                    false,
                    elapsed,
                );
                JobOutcome::Failed {
                    reason,
                    message: e.to_string(),
                    progress: self.store.job_progress(job_id).await?,
                }
            }
        };

        Ok(outcome)
    }
}
