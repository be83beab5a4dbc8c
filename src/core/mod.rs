//! Core transfer engine for Porter.
//!
//! # Modules
//!
//! - [`copier`] - the copy orchestrator and its worklist
//! - [`idempotent`] - at-most-once import side effects per job
//! - [`retry`] - retry strategies, the strategy library and the retry wrapper
//! - [`upload`] - bounded-concurrency uploads grouped by destination container
//! - [`job`] - job lifecycle around one copy
//!
//! # Transfer Workflow
//!
//! 1. **Resolve**: pick the exporter and importer for the job's services
//! 2. **Bind**: reload the job's cached results and errors
//! 3. **Export**: fetch the page on top of the worklist
//! 4. **Import**: write the page through the idempotent executor
//! 5. **Record**: add counts and bytes to the job
//! 6. **Advance**: push the next page and discovered containers, persist the worklist
//! 7. **Finish**: attach item errors and record the job's terminal state
//!
//! # Example
//!
//! ```rust,no_run
//! use porter::adapters::local;
//! use porter::adapters::metrics::LoggingMetricRecorder;
//! use porter::adapters::registry::AdapterRegistry;
//! use porter::adapters::store::{InMemoryJobStore, JobStore};
//! use porter::adapters::traits::AuthData;
//! use porter::config::TransferConfig;
//! use porter::core::job::JobRunner;
//! use porter::core::retry::{RetryStrategyLibrary, SystemClock};
//! use porter::domain::{DataVertical, TransferJob};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = AdapterRegistry::new();
//! local::register(&mut registry, "/data/in", "/data/out");
//!
//! let store = Arc::new(InMemoryJobStore::new());
//! let job = TransferJob::new(DataVertical::Photos, local::local_service(), local::local_service());
//! store.create_job(&job).await?;
//!
//! let runner = JobRunner::new(
//!     Arc::new(registry),
//!     store,
//!     Arc::new(LoggingMetricRecorder::new()),
//!     Arc::new(RetryStrategyLibrary::default()),
//!     Arc::new(SystemClock),
//!     TransferConfig::default(),
//! );
//!
//! let outcome = runner.run(job.id, &AuthData::none(), &AuthData::none()).await?;
//! println!("Copied {} items", outcome.progress().total_items());
//! # Ok(())
//! # }
//! ```

pub mod copier;
pub mod idempotent;
pub mod job;
pub mod retry;
pub mod upload;
