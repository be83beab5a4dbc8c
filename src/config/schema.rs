//! Configuration schema types
//!
//! Every section has defaults, so an empty file is a valid configuration
//! that runs with an in-memory job store.

use crate::config::secret::deserialize_token;
use crate::config::SecretString;
use crate::core::retry::{RetryMapping, RetryStrategy, RetryStrategyLibrary};
use crate::domain::Result;
use serde::{Deserialize, Serialize};

/// Main Porter configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PorterConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Paging and upload limits
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Retry strategies
    #[serde(default)]
    pub retry: RetryConfig,

    /// Where job state lives
    #[serde(default)]
    pub job_store: JobStoreConfig,

    /// Credentials handed to the adapters
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PorterConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.application.validate()?;
        self.transfer.validate()?;
        self.retry.validate()?;
        self.job_store.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Paging and upload limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Container groups uploaded concurrently within one page
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,

    /// Items handed to the destination per batch
    #[serde(default = "default_upload_batch_size")]
    pub upload_batch_size: usize,

    /// Items per exported page, for adapters that choose their own page size
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: default_max_concurrent_uploads(),
            upload_batch_size: default_upload_batch_size(),
            page_size: default_page_size(),
        }
    }
}

impl TransferConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.max_concurrent_uploads == 0 {
            return Err("transfer.max_concurrent_uploads must be greater than 0".to_string());
        }
        if self.max_concurrent_uploads > 64 {
            return Err("transfer.max_concurrent_uploads cannot exceed 64".to_string());
        }
        if self.upload_batch_size == 0 {
            return Err("transfer.upload_batch_size must be greater than 0".to_string());
        }
        if self.page_size == 0 {
            return Err("transfer.page_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Retry strategies
///
/// Mappings are checked in order; the first one matching the data type,
/// service and error message wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Strategy used when no mapping matches
    #[serde(default)]
    pub default: RetryStrategy,

    /// Ordered strategy mappings
    #[serde(default)]
    pub mappings: Vec<RetryMapping>,
}

impl RetryConfig {
    /// Builds the strategy library
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid strategies or patterns.
    pub fn build_library(&self) -> Result<RetryStrategyLibrary> {
        RetryStrategyLibrary::new(self.mappings.clone(), self.default.clone())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        self.build_library()
            .map(|_| ())
            .map_err(|e| format!("retry: {e}"))
    }
}

/// Job store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStoreKind {
    /// Process-local; state is lost on exit
    #[default]
    Memory,
    /// One JSON document per job below `path`
    File,
}

/// Job store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStoreConfig {
    /// Backend (memory, file)
    #[serde(default)]
    pub kind: JobStoreKind,

    /// Directory for the file backend
    #[serde(default = "default_job_store_path")]
    pub path: String,
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self {
            kind: JobStoreKind::default(),
            path: default_job_store_path(),
        }
    }
}

impl JobStoreConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.kind == JobStoreKind::File && self.path.trim().is_empty() {
            return Err("job_store.path is required when job_store.kind = 'file'".to_string());
        }
        Ok(())
    }
}

/// Credentials handed to the adapters
///
/// An empty token is the same as no token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Access token for the source service
    #[serde(
        default,
        deserialize_with = "deserialize_token",
        skip_serializing_if = "Option::is_none"
    )]
    pub export_token: Option<SecretString>,

    /// Access token for the destination service
    #[serde(
        default,
        deserialize_with = "deserialize_token",
        skip_serializing_if = "Option::is_none"
    )]
    pub import_token: Option<SecretString>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Maximum log file size in MB
    #[serde(default = "default_local_max_size_mb")]
    pub local_max_size_mb: usize,
}

impl LoggingConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_size_mb == 0 {
            return Err("logging.local_max_size_mb must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_size_mb: default_local_max_size_mb(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_uploads() -> usize {
    4
}

fn default_upload_batch_size() -> usize {
    50
}

fn default_page_size() -> usize {
    100
}

fn default_job_store_path() -> String {
    "./porter-jobs".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_size_mb() -> usize {
    100
}
