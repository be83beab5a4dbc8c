//! Retry strategies
//!
//! A strategy answers two questions after a failed attempt: try again, and
//! if so, after how long. Delays never decrease with the attempt number and
//! never exceed the configured maximum.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How to retry a failed unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Fail on the first error
    NoRetry,

    /// Fixed delay between attempts
    Uniform {
        /// Total attempts, first try included
        max_attempts: u32,
        /// Delay between attempts in milliseconds
        interval_ms: u64,
    },

    /// Delay grows by `multiplier` after every attempt, capped at `max_interval_ms`
    ExponentialBackoff {
        /// Total attempts, first try included
        max_attempts: u32,
        /// Delay after the first failure in milliseconds
        initial_interval_ms: u64,
        /// Growth factor, at least 1.0
        multiplier: f64,
        /// Upper bound for any single delay in milliseconds
        max_interval_ms: u64,
    },

    /// Give up at once and mark the work as skippable
    Skip,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            max_attempts: 5,
            initial_interval_ms: 1000,
            multiplier: 2.0,
            max_interval_ms: 30_000,
        }
    }
}

impl RetryStrategy {
    /// Whether another attempt may follow `attempt` failed attempts
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self {
            Self::NoRetry | Self::Skip => false,
            Self::Uniform { max_attempts, .. } | Self::ExponentialBackoff { max_attempts, .. } => {
                attempt < *max_attempts
            }
        }
    }

    /// Delay before the attempt that follows failed attempt number `attempt`
    ///
    /// `attempt` starts at 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::NoRetry | Self::Skip => Duration::ZERO,
            Self::Uniform { interval_ms, .. } => Duration::from_millis(*interval_ms),
            Self::ExponentialBackoff {
                initial_interval_ms,
                multiplier,
                max_interval_ms,
                ..
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let delay = *initial_interval_ms as f64 * multiplier.powi(exponent);
                let capped = if delay.is_finite() {
                    delay.min(*max_interval_ms as f64)
                } else {
                    *max_interval_ms as f64
                };
                Duration::from_millis(capped as u64)
            }
        }
    }

    /// Whether work that failed under this strategy can be skipped
    pub fn can_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Maximum attempts, first try included
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::NoRetry | Self::Skip => 1,
            Self::Uniform { max_attempts, .. } | Self::ExponentialBackoff { max_attempts, .. } => {
                *max_attempts
            }
        }
    }

    /// Validates the strategy parameters
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::NoRetry | Self::Skip => Ok(()),
            Self::Uniform { max_attempts, .. } => {
                if *max_attempts == 0 {
                    return Err("retry max_attempts must be >= 1".to_string());
                }
                Ok(())
            }
            Self::ExponentialBackoff {
                max_attempts,
                initial_interval_ms,
                multiplier,
                max_interval_ms,
            } => {
                if *max_attempts == 0 {
                    return Err("retry max_attempts must be >= 1".to_string());
                }
                if !multiplier.is_finite() || *multiplier < 1.0 {
                    return Err(format!("retry multiplier must be >= 1.0, got {multiplier}"));
                }
                if initial_interval_ms > max_interval_ms {
                    return Err(format!(
                        "retry initial_interval_ms ({initial_interval_ms}) cannot exceed max_interval_ms ({max_interval_ms})"
                    ));
                }
                Ok(())
            }
        }
    }
}
