//! Job store implementations
//!
//! - [`InMemoryJobStore`] - process-local, used in tests and one-shot runs
//! - [`FileJobStore`] - JSON documents on disk, survives restarts

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileJobStore;
pub use memory::InMemoryJobStore;
pub use traits::{JobStore, ERROR_KEY_PREFIX, RESULT_KEY_PREFIX, WORKLIST_KEY};

use crate::config::{JobStoreConfig, JobStoreKind};
use crate::domain::Result;
use std::sync::Arc;

/// Create a job store based on configuration
///
/// # Errors
///
/// Returns an error if the file store directory cannot be created.
pub async fn create_job_store(config: &JobStoreConfig) -> Result<Arc<dyn JobStore>> {
    match config.kind {
        JobStoreKind::Memory => {
            tracing::info!("Using in-memory job store");
            Ok(Arc::new(InMemoryJobStore::new()))
        }
        JobStoreKind::File => {
            tracing::info!(path = %config.path, "Using file job store");
            Ok(Arc::new(FileJobStore::open(&config.path).await?))
        }
    }
}
