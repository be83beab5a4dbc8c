//! Domain error types
//!
//! Every failure raised by an adapter, the job store or the engine itself is a
//! [`TransferError`]. Its variant decides how the engine reacts: retryable
//! errors go back through the retry strategy, item-level errors are recorded
//! by the idempotent executor, and job-fatal errors stop the copy with a
//! [`FailureReason`] the caller can act on.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main Porter error type
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// Network blip or 5xx from a vendor
    #[error("Transient error: {0}")]
    Transient(String),

    /// Vendor asked us to slow down
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// A vendor call did not answer in time
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// A single item could not be created at the destination
    #[error("Item error: {0}")]
    Item(String),

    /// I/O failure while moving a single item
    #[error("I/O error: {0}")]
    Io(String),

    /// Credentials expired or were revoked
    #[error("Session invalidated: {0}")]
    SessionInvalidated(String),

    /// Destination has no room left
    #[error("Destination full: {0}")]
    DestinationFull(String),

    /// The user did not grant the access the transfer needs
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The service cannot handle this data or job shape
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A lookup found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Job store errors
    #[error("Job store error: {0}")]
    Store(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The job was cancelled while work was in flight
    #[error("Transfer cancelled")]
    Cancelled,

    /// Unclassified errors
    #[error("{0}")]
    Other(String),
}

/// How the engine treats an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Safe to try again
    Retryable,
    /// Confined to one item; record it and keep going
    PerItem,
    /// Stops the whole job
    Fatal(FailureReason),
    /// Unknown; retried per strategy, then fatal
    Unclassified,
}

impl TransferError {
    /// Classifies this error for the retry wrapper and the copier
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transient(_) | Self::RateLimited(_) | Self::Timeout(_) => ErrorClass::Retryable,
            Self::Item(_) | Self::Io(_) => ErrorClass::PerItem,
            Self::SessionInvalidated(_) => ErrorClass::Fatal(FailureReason::SessionInvalidated),
            Self::DestinationFull(_) => ErrorClass::Fatal(FailureReason::DestinationFull),
            Self::PermissionDenied(_) => ErrorClass::Fatal(FailureReason::PermissionDenied),
            Self::Unsupported(_) => ErrorClass::Fatal(FailureReason::Unsupported),
            Self::Cancelled => ErrorClass::Fatal(FailureReason::Cancelled),
            Self::NotFound(_)
            | Self::Configuration(_)
            | Self::Store(_)
            | Self::Serialization(_)
            | Self::Other(_) => ErrorClass::Unclassified,
        }
    }

    /// Returns true for errors that must stop the job without retrying
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Fatal(_))
    }

    /// Returns true for errors the idempotent executor records and swallows
    pub fn is_item_level(&self) -> bool {
        matches!(self.class(), ErrorClass::PerItem)
    }

    /// Returns true for transient errors
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Retryable)
    }

    /// Failure reason for job-fatal errors
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.class() {
            ErrorClass::Fatal(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Why a job stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Auth expired or revoked; the job can resume after re-authorization
    SessionInvalidated,
    /// Destination storage quota exceeded
    DestinationFull,
    /// Missing scopes or access
    PermissionDenied,
    /// Unsupported data or service combination
    Unsupported,
    /// Cancelled by an operator or a shutdown signal
    Cancelled,
    /// An unclassified error kept failing after every retry
    RetriesExhausted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SessionInvalidated => "session_invalidated",
            Self::DestinationFull => "destination_full",
            Self::PermissionDenied => "permission_denied",
            Self::Unsupported => "unsupported",
            Self::Cancelled => "cancelled",
            Self::RetriesExhausted => "retries_exhausted",
        };
        f.write_str(s)
    }
}

/// Error surfaced by the retrying callable
///
/// Carries the last underlying [`TransferError`] so callers can still
/// classify the failure.
#[derive(Debug, Clone, Error)]
#[error("Failed after {attempts} attempt(s): {source}")]
pub struct RetryError {
    /// Number of attempts made, starting at 1
    pub attempts: u32,

    /// Whether the strategy allows skipping this unit of work
    pub can_skip: bool,

    /// Last failure
    #[source]
    pub source: TransferError,
}

impl RetryError {
    /// Creates a new retry error
    pub fn new(attempts: u32, can_skip: bool, source: TransferError) -> Self {
        Self {
            attempts,
            can_skip,
            source,
        }
    }

    /// Failure reason of the wrapped error, if it is job-fatal
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.source.failure_reason()
    }
}

/// Which half of a copy iteration failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Exporting a page
    Export,
    /// Importing a page
    Import,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Export => f.write_str("export"),
            Self::Import => f.write_str("import"),
        }
    }
}

/// Error returned when a copy stops before the source is exhausted
#[derive(Debug, Error)]
pub enum CopyError {
    /// A job-fatal error; the caller decides whether to pause or fail the job
    #[error("Job-fatal {stage} failure ({reason}): {source}")]
    Fatal {
        stage: Stage,
        reason: FailureReason,
        #[source]
        source: RetryError,
    },

    /// Retries ran out on an error that is not job-fatal by itself
    #[error("{stage} failed: {source}")]
    RetriesExhausted {
        stage: Stage,
        #[source]
        source: RetryError,
    },

    /// Cancellation observed at the top of an iteration
    #[error("Copy cancelled after {iterations} iteration(s)")]
    Cancelled { iterations: usize },

    /// The job store could not record progress
    #[error("Job store error: {0}")]
    Store(#[source] TransferError),
}

impl CopyError {
    /// Failure reason recorded on the job for this error
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::Fatal { reason, .. } => *reason,
            Self::RetriesExhausted { .. } | Self::Store(_) => FailureReason::RetriesExhausted,
            Self::Cancelled { .. } => FailureReason::Cancelled,
        }
    }

    /// Builds the copy error for a failed export or import stage
    pub fn from_retry(stage: Stage, err: RetryError) -> Self {
        match err.failure_reason() {
            Some(reason) => Self::Fatal {
                stage,
                reason,
                source: err,
            },
            None => Self::RetriesExhausted { stage, source: err },
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransferError {
    fn from(err: serde_json::Error) -> Self {
        TransferError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for TransferError {
    fn from(err: toml::de::Error) -> Self {
        TransferError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_display() {
        let err = TransferError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_error_classes() {
        assert!(TransferError::RateLimited("429".into()).is_retryable());
        assert!(TransferError::Timeout("30s".into()).is_retryable());
        assert!(TransferError::Item("photo failed".into()).is_item_level());
        assert!(TransferError::Io("broken pipe".into()).is_item_level());
        assert!(TransferError::SessionInvalidated("token revoked".into()).is_fatal());
        assert!(TransferError::DestinationFull("quota".into()).is_fatal());
        assert_eq!(
            TransferError::Other("??".into()).class(),
            ErrorClass::Unclassified
        );
    }

    #[test]
    fn test_failure_reason_mapping() {
        assert_eq!(
            TransferError::PermissionDenied("scope".into()).failure_reason(),
            Some(FailureReason::PermissionDenied)
        );
        assert_eq!(TransferError::Transient("5xx".into()).failure_reason(), None);
    }

    #[test]
    fn test_retry_error_preserves_source() {
        let err = RetryError::new(3, false, TransferError::DestinationFull("full".into()));
        assert_eq!(err.failure_reason(), Some(FailureReason::DestinationFull));
        assert!(err.to_string().contains("3 attempt(s)"));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Destination full: full");
    }

    #[test]
    fn test_copy_error_from_retry() {
        let fatal = CopyError::from_retry(
            Stage::Import,
            RetryError::new(1, false, TransferError::SessionInvalidated("expired".into())),
        );
        assert!(matches!(
            fatal,
            CopyError::Fatal {
                reason: FailureReason::SessionInvalidated,
                ..
            }
        ));

        let exhausted = CopyError::from_retry(
            Stage::Export,
            RetryError::new(5, false, TransferError::Other("boom".into())),
        );
        assert!(matches!(exhausted, CopyError::RetriesExhausted { .. }));
        assert_eq!(exhausted.failure_reason(), FailureReason::RetriesExhausted);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: TransferError = io_err.into();
        assert!(matches!(err, TransferError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: TransferError = json_err.into();
        assert!(matches!(err, TransferError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: TransferError = toml_err.into();
        assert!(err.to_string().contains("TOML parse error"));
    }
}
