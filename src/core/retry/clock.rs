//! Injectable time source for backoff
//!
//! Production code sleeps on the tokio timer; tests use [`RecordingClock`]
//! to observe backoff delays without waiting for them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Time source used by the retry wrapper
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;

    /// Suspends the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time and tokio sleeps
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock that records sleeps and returns immediately
///
/// # Example
///
/// ```
/// use porter::core::retry::{Clock, RecordingClock};
/// use std::time::Duration;
///
/// # async fn example() {
/// let clock = RecordingClock::new();
/// clock.sleep(Duration::from_millis(250)).await;
/// assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
/// # }
/// ```
#[derive(Debug)]
pub struct RecordingClock {
    state: Mutex<RecordingState>,
}

#[derive(Debug)]
struct RecordingState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl RecordingClock {
    /// Starts at the current wall-clock time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Starts at a fixed instant
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(RecordingState {
                now,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        match self.state.lock() {
            Ok(state) => state.sleeps.clone(),
            Err(poisoned) => poisoned.into_inner().sleeps.clone(),
        }
    }

    /// Sum of every sleep requested so far
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Default for RecordingClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        match self.state.lock() {
            Ok(state) => state.now,
            Err(poisoned) => poisoned.into_inner().now,
        }
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.sleeps.push(duration);
        if let Ok(step) = chrono::Duration::from_std(duration) {
            state.now += step;
        }
    }
}
