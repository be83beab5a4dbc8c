//! Result aliases
//!
//! Most fallible code returns [`Result`]. The copy loop reports through
//! [`CopyResult`] so callers can tell cancellation and retry exhaustion
//! apart from ordinary adapter or store errors.
//!
//! ```
//! use porter::domain::{CopyError, CopyResult, Result, TransferError};
//!
//! fn lookup(found: bool) -> Result<u32> {
//!     if found {
//!         Ok(7)
//!     } else {
//!         Err(TransferError::NotFound("job".to_string()))
//!     }
//! }
//!
//! fn stopped() -> CopyResult<()> {
//!     Err(CopyError::Cancelled { iterations: 3 })
//! }
//!
//! assert_eq!(lookup(true).unwrap(), 7);
//! assert!(stopped().is_err());
//! ```

use super::errors::{CopyError, TransferError};

pub type Result<T> = std::result::Result<T, TransferError>;

/// Outcome of a copy run
pub type CopyResult<T> = std::result::Result<T, CopyError>;
