//! Domain models and types for Porter.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`ServiceId`])
//! - **Data model** ([`DataPage`], [`DataItem`], [`DataVertical`])
//! - **Page results** ([`ExportResult`], [`ImportResult`], [`ContinuationData`])
//! - **Job records** ([`TransferJob`], [`ErrorDetail`], [`JobProgress`])
//! - **Error types** ([`TransferError`], [`RetryError`], [`CopyError`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TransferError>`]:
//!
//! ```rust
//! use porter::domain::{Result, TransferError};
//!
//! fn upload() -> Result<()> {
//!     Err(TransferError::RateLimited("retry after 5s".to_string()))
//! }
//!
//! let err = upload().unwrap_err();
//! assert!(err.is_retryable());
//! ```

pub mod data;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;
pub mod transfer;

// Re-export commonly used types for convenience
pub use data::{DataItem, DataPage, DataVertical, DestinationContainer, ItemKind};
pub use errors::{CopyError, ErrorClass, FailureReason, RetryError, Stage, TransferError};
pub use ids::{JobId, ServiceId};
pub use job::{ErrorDetail, JobProgress, JobState, TransferJob};
pub use result::{CopyResult, Result};
pub use transfer::{
    merge_counts, ContainerResource, ContinuationData, ContinuationToken, ExportInformation,
    ExportResult, ExportResultType, ImportResult, ImportResultType, ItemCounts,
};
