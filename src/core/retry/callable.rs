//! Retrying callable
//!
//! Runs one unit of work (an export page or an import page) until it
//! succeeds, hits a job-fatal error, or its strategy gives up. The last
//! error is always returned inside a [`RetryError`], never swallowed.

use super::clock::Clock;
use super::library::RetryStrategyLibrary;
use crate::domain::{DataVertical, Result, RetryError, ServiceId};
use crate::log_retry_attempt;
use std::future::Future;
use std::sync::Arc;

/// Retry wrapper bound to one (data type, service) pair
#[derive(Clone)]
pub struct RetryingCallable {
    library: Arc<RetryStrategyLibrary>,
    clock: Arc<dyn Clock>,
    data_type: DataVertical,
    service: ServiceId,
}

impl RetryingCallable {
    /// Creates a new retrying callable
    pub fn new(
        library: Arc<RetryStrategyLibrary>,
        clock: Arc<dyn Clock>,
        data_type: DataVertical,
        service: ServiceId,
    ) -> Self {
        Self {
            library,
            clock,
            data_type,
            service,
        }
    }

    /// Service this callable retries against
    pub fn service(&self) -> &ServiceId {
        &self.service
    }

    /// Runs `operation` with retries
    ///
    /// `operation` receives the attempt number, starting at 1. Job-fatal
    /// errors are returned after the attempt that raised them.
    ///
    /// # Errors
    ///
    /// Returns a [`RetryError`] wrapping the last failure.
    pub async fn call<T, F, Fut>(&self, mut operation: F) -> std::result::Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            service = %self.service,
                            data_type = %self.data_type,
                            attempt = attempt,
                            "Succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if error.is_fatal() {
                tracing::warn!(
                    service = %self.service,
                    data_type = %self.data_type,
                    attempt = attempt,
                    error = %error,
                    "Job-fatal error, not retrying"
                );
                return Err(RetryError::new(attempt, false, error));
            }

            let strategy = self
                .library
                .strategy_for_error(self.data_type, &self.service, &error);

            if !strategy.should_retry(attempt) {
                tracing::warn!(
                    service = %self.service,
                    data_type = %self.data_type,
                    attempts = attempt,
                    can_skip = strategy.can_skip(),
                    error = %error,
                    "Giving up after final attempt"
                );
                return Err(RetryError::new(attempt, strategy.can_skip(), error));
            }

            let delay = strategy.delay_for(attempt);
            log_retry_attempt!(self.service, attempt, strategy.max_attempts(), error, delay);
            self.clock.sleep(delay).await;
        }
    }
}
