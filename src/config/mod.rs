//! Configuration management for Porter.
//!
//! Porter reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PORTER_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use porter::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("porter.toml")?;
//! println!("Uploads in flight: {}", config.transfer.max_concurrent_uploads);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`TransferConfig`] - page size, upload batch size and concurrency
//! - [`RetryConfig`] - default retry strategy and ordered mappings
//! - [`JobStoreConfig`] - memory or file job store
//! - [`CredentialsConfig`] - source and destination tokens
//! - [`LoggingConfig`] - rotating file logs
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [transfer]
//! max_concurrent_uploads = 4
//! upload_batch_size = 50
//!
//! [retry.default]
//! type = "exponential_backoff"
//! max_attempts = 5
//! initial_interval_ms = 1000
//! multiplier = 2.0
//! max_interval_ms = 30000
//!
//! [[retry.mappings]]
//! data_type = "photos"
//! error_patterns = ["(?i)unsupported media"]
//! strategy = { type = "skip" }
//!
//! [job_store]
//! kind = "file"
//! path = "/var/lib/porter/jobs"
//!
//! [credentials]
//! export_token = "${PORTER_EXPORT_TOKEN}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CredentialsConfig, JobStoreConfig, JobStoreKind, LoggingConfig,
    PorterConfig, RetryConfig, TransferConfig,
};
pub use secret::{deserialize_token, secret_string, secret_string_opt, SecretString, SecretValue};
