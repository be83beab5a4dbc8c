//! Logging
//!
//! [`init_logging`] installs the subscriber. The macros below keep the field
//! names of the events every copy emits identical across modules, so log
//! queries can rely on `job_id`, `iteration` and `attempt`.
//!
//! ```no_run
//! use porter::config::LoggingConfig;
//! use porter::logging::init_logging;
//!
//! let _guard = init_logging("debug", &LoggingConfig::default()).expect("logger");
//! tracing::info!(job_id = "1f0c", "Transfer started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard, LOG_FILE_PREFIX};

/// One stage event of a copy iteration
///
/// ```no_run
/// use porter::domain::JobId;
/// use porter::log_copy_iteration;
///
/// log_copy_iteration!(JobId::new(), 3, "started export");
/// ```
#[macro_export]
macro_rules! log_copy_iteration {
    ($job_id:expr, $iteration:expr, $event:expr) => {
        tracing::info!(job_id = %$job_id, iteration = $iteration, "{}", $event)
    };
}

/// A job store write that failed without stopping the copy
///
/// ```no_run
/// use porter::domain::{JobId, TransferError};
/// use porter::log_store_failure;
///
/// let error = TransferError::Store("disk full".to_string());
/// log_store_failure!(JobId::new(), error, "clear worklist");
/// ```
#[macro_export]
macro_rules! log_store_failure {
    ($job_id:expr, $error:expr, $action:expr) => {
        tracing::error!(job_id = %$job_id, action = $action, error = %$error, "Job store write failed")
    };
}

/// A failed attempt that will be retried after `delay`
///
/// ```no_run
/// use porter::domain::ServiceId;
/// use porter::log_retry_attempt;
/// use std::time::Duration;
///
/// let service = ServiceId::new("local").unwrap();
/// log_retry_attempt!(service, 2, 5, "Request timeout", Duration::from_millis(2000));
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($service:expr, $attempt:expr, $max_attempts:expr, $error:expr, $delay:expr) => {
        tracing::warn!(
            service = %$service,
            attempt = $attempt,
            of = $max_attempts,
            error = %$error,
            backoff_ms = $delay.as_millis() as u64,
            "Attempt failed, backing off"
        )
    };
}
