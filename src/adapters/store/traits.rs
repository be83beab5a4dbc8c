//! Job store abstraction
//!
//! The job store is the only state shared between workers. It holds job
//! records, running aggregates, and the keyed data records the idempotent
//! executor and the copier use to survive restarts.

use crate::domain::{ErrorDetail, ItemCounts, JobId, JobProgress, Result, TransferJob};
use async_trait::async_trait;
use serde_json::Value;

/// Key prefix for cached idempotent results
pub const RESULT_KEY_PREFIX: &str = "result:";

/// Key prefix for recorded idempotent errors
pub const ERROR_KEY_PREFIX: &str = "error:";

/// Key of the persisted copy worklist
pub const WORKLIST_KEY: &str = "worklist";

/// Persistent per-job storage
///
/// Mutations of one job's aggregates are atomic: concurrent `add_counts`
/// or `add_bytes` calls for the same job never lose updates.
///
/// `job_progress` reports both the errors added with `add_errors_to_job`
/// and every `error:`-prefixed data record, so an idempotency error that is
/// later cleared disappears from the job's error list.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores a new job record
    ///
    /// # Errors
    ///
    /// Returns an error if a job with the same id already exists.
    async fn create_job(&self, job: &TransferJob) -> Result<()>;

    /// Loads a job record
    async fn find_job(&self, job_id: JobId) -> Result<Option<TransferJob>>;

    /// Replaces an existing job record
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::TransferError::NotFound`] if the job does not exist.
    async fn update_job(&self, job: &TransferJob) -> Result<()>;

    /// Lists every job record
    async fn list_jobs(&self) -> Result<Vec<TransferJob>>;

    /// Adds item counts to the job's running totals
    async fn add_counts(&self, job_id: JobId, counts: &ItemCounts) -> Result<()>;

    /// Adds to the job's running byte total
    async fn add_bytes(&self, job_id: JobId, bytes: u64) -> Result<()>;

    /// Attaches errors to the job, replacing earlier errors with the same id
    async fn add_errors_to_job(&self, job_id: JobId, errors: &[ErrorDetail]) -> Result<()>;

    /// Current aggregates and errors for a job
    async fn job_progress(&self, job_id: JobId) -> Result<JobProgress>;

    /// Creates a data record
    ///
    /// # Errors
    ///
    /// Returns an error if the key already exists for this job.
    async fn create_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()>;

    /// Replaces an existing data record
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::TransferError::NotFound`] if the key does not exist.
    async fn update_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()>;

    /// Loads a data record
    async fn find_data(&self, job_id: JobId, key: &str) -> Result<Option<Value>>;

    /// Removes a data record; missing keys are ignored
    async fn remove_data(&self, job_id: JobId, key: &str) -> Result<()>;

    /// Lists a job's data records whose key starts with `prefix`
    async fn list_data(&self, job_id: JobId, prefix: &str) -> Result<Vec<(String, Value)>>;

    /// Creates or replaces a data record in one atomic write
    async fn put_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()>;
}

/// Builds the job-visible error list from explicit errors and error records
pub(crate) fn collect_errors(
    explicit: &[ErrorDetail],
    records: impl IntoIterator<Item = (String, Value)>,
) -> Vec<ErrorDetail> {
    let mut errors: Vec<ErrorDetail> = Vec::new();
    for (key, value) in records {
        match serde_json::from_value::<ErrorDetail>(value) {
            Ok(detail) => errors.push(detail),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipping unreadable error record");
            }
        }
    }
    for detail in explicit {
        if !errors.iter().any(|e| e.id == detail.id) {
            errors.push(detail.clone());
        }
    }
    errors
}

/// Replaces errors with matching ids, appending the rest
pub(crate) fn upsert_errors(existing: &mut Vec<ErrorDetail>, incoming: &[ErrorDetail]) {
    for detail in incoming {
        match existing.iter_mut().find(|e| e.id == detail.id) {
            Some(slot) => *slot = detail.clone(),
            None => existing.push(detail.clone()),
        }
    }
}
