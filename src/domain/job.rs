//! Transfer job records
//!
//! A job moves one data vertical from one service to another. Its record
//! lives in the job store next to the per-job aggregates and idempotency
//! entries.

use super::data::DataVertical;
use super::errors::{FailureReason, TransferError};
use super::ids::{JobId, ServiceId};
use super::transfer::{ExportInformation, ItemCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not yet picked up
    #[default]
    New,
    /// A worker is copying
    InProgress,
    /// Copy finished; item-level errors may still be attached
    Complete,
    /// Copy stopped on a fatal error
    Error,
    /// Stopped by an operator or shutdown
    Canceled,
}

impl JobState {
    /// True once the job will not be picked up again without operator action
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Canceled)
    }
}

/// A transfer job
///
/// # Examples
///
/// ```
/// use porter::domain::{DataVertical, JobState, TransferJob};
/// use porter::domain::ids::ServiceId;
///
/// let job = TransferJob::new(
///     DataVertical::Photos,
///     ServiceId::new("local").unwrap(),
///     ServiceId::new("local").unwrap(),
/// );
/// assert_eq!(job.state, JobState::New);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferJob {
    /// Job identifier
    pub id: JobId,

    /// Vertical being moved
    pub data_type: DataVertical,

    /// Source service
    pub export_service: ServiceId,

    /// Destination service
    pub import_service: ServiceId,

    /// Optional starting cursor, e.g. a single album
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_information: Option<ExportInformation>,

    /// Lifecycle state
    pub state: JobState,

    /// Set when the job failed or was cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last state change
    pub updated_at: DateTime<Utc>,
}

impl TransferJob {
    /// Creates a new job in the `New` state
    pub fn new(data_type: DataVertical, export_service: ServiceId, import_service: ServiceId) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            data_type,
            export_service,
            import_service,
            export_information: None,
            state: JobState::New,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Uses a fixed job id
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    /// Sets the starting cursor
    pub fn with_export_information(mut self, info: ExportInformation) -> Self {
        self.export_information = Some(info);
        self
    }

    /// Mark the job as started
    pub fn mark_in_progress(&mut self) {
        self.state = JobState::InProgress;
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Mark the job as completed
    pub fn mark_complete(&mut self) {
        self.state = JobState::Complete;
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed
    pub fn mark_failed(&mut self, reason: FailureReason) {
        self.state = JobState::Error;
        self.failure_reason = Some(reason);
        self.updated_at = Utc::now();
    }

    /// Mark the job as cancelled
    pub fn mark_canceled(&mut self) {
        self.state = JobState::Canceled;
        self.failure_reason = Some(FailureReason::Cancelled);
        self.updated_at = Utc::now();
    }
}

/// One recorded failure, usually for a single item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Idempotent id of the failed item
    pub id: String,

    /// Display name of the failed item
    pub title: String,

    /// Serialized error
    pub exception: String,

    /// Skippable errors are reported but do not fail the job
    pub can_skip: bool,

    /// When the error was recorded
    pub recorded_at: DateTime<Utc>,
}

impl ErrorDetail {
    /// Creates a new error detail
    pub fn new(id: impl Into<String>, title: impl Into<String>, error: &TransferError) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            exception: error.to_string(),
            can_skip: false,
            recorded_at: Utc::now(),
        }
    }

    /// Sets the skip flag
    pub fn skippable(mut self, can_skip: bool) -> Self {
        self.can_skip = can_skip;
        self
    }
}

/// Running aggregates for a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Items written, by kind
    #[serde(default)]
    pub counts: ItemCounts,

    /// Bytes written
    #[serde(default)]
    pub bytes: u64,

    /// Errors attached to the job
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

impl JobProgress {
    /// Total items across kinds
    pub fn total_items(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Errors recorded with `can_skip == false`
    pub fn unskippable_errors(&self) -> impl Iterator<Item = &ErrorDetail> {
        self.errors.iter().filter(|e| !e.can_skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> TransferJob {
        TransferJob::new(
            DataVertical::Contacts,
            ServiceId::new("source").unwrap(),
            ServiceId::new("dest").unwrap(),
        )
    }

    #[test]
    fn test_job_state_transitions() {
        let mut job = job();
        assert_eq!(job.state, JobState::New);
        assert!(!job.state.is_terminal());

        job.mark_in_progress();
        assert_eq!(job.state, JobState::InProgress);

        job.mark_failed(FailureReason::SessionInvalidated);
        assert_eq!(job.state, JobState::Error);
        assert_eq!(job.failure_reason, Some(FailureReason::SessionInvalidated));
        assert!(job.state.is_terminal());

        job.mark_in_progress();
        assert!(job.failure_reason.is_none());

        job.mark_complete();
        assert_eq!(job.state, JobState::Complete);
    }

    #[test]
    fn test_job_serde() {
        let job = job();
        let json = serde_json::to_string(&job).unwrap();
        let back: TransferJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.data_type, DataVertical::Contacts);
    }

    #[test]
    fn test_error_detail() {
        let err = TransferError::Item("upload rejected".to_string());
        let detail = ErrorDetail::new("p1", "beach.jpg", &err).skippable(true);
        assert_eq!(detail.exception, "Item error: upload rejected");
        assert!(detail.can_skip);
    }

    #[test]
    fn test_progress_totals() {
        let progress = JobProgress {
            counts: ItemCounts::from([("photos".to_string(), 3), ("albums".to_string(), 1)]),
            bytes: 10,
            errors: vec![
                ErrorDetail::new("a", "a", &TransferError::Item("x".into())).skippable(true),
                ErrorDetail::new("b", "b", &TransferError::Other("y".into())),
            ],
        };
        assert_eq!(progress.total_items(), 4);
        assert_eq!(progress.unskippable_errors().count(), 1);
    }
}
