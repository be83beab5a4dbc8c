//! Bounded retries for page-level work
//!
//! - [`RetryStrategy`] - how often and how long to wait
//! - [`RetryStrategyLibrary`] - picks a strategy per data type, service and error
//! - [`RetryingCallable`] - runs the work and applies the strategy
//! - [`Clock`] - injectable time source for the backoff sleeps

pub mod callable;
pub mod clock;
pub mod library;
pub mod strategy;

pub use callable::RetryingCallable;
pub use clock::{Clock, RecordingClock, SystemClock};
pub use library::{RetryMapping, RetryStrategyLibrary};
pub use strategy::RetryStrategy;
