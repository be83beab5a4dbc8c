//! CLI command implementations
//!
//! Every command returns a process exit code:
//!
//! - `0` success
//! - `1` completed with skipped items
//! - `2` configuration error
//! - `4` job store unavailable
//! - `5` fatal error
//! - `130` interrupted

pub mod init;
pub mod status;
pub mod transfer;
pub mod validate;

use crate::adapters::store::{create_job_store, JobStore};
use crate::config::{load_config, PorterConfig};
use std::path::Path;
use std::sync::Arc;

/// Loads `config_path`, or the defaults when the file does not exist
pub(crate) fn load_or_default(config_path: &str) -> crate::domain::Result<PorterConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::info!(config_path = %config_path, "Configuration file not found, using defaults");
        Ok(PorterConfig::default())
    }
}

/// Opens the configured job store, printing the failure
pub(crate) async fn open_store(config: &PorterConfig) -> Result<Arc<dyn JobStore>, i32> {
    match create_job_store(&config.job_store).await {
        Ok(store) => Ok(store),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open job store");
            eprintln!("Failed to open job store: {e}");
            Err(4)
        }
    }
}
