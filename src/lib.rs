// Porter - Resumable Data Transfer Engine
// Copyright (c) 2025 Porter Contributors
// Licensed under the MIT License

//! # Porter - Resumable Data Transfer
//!
//! Porter copies a user's data of one kind (photos, contacts, calendar,
//! mail...) from a source service to a destination service as a
//! long-running, resumable job.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Paging** through a source with continuation tokens and nested containers
//! - **Importing** each page with at-most-once side effects per item
//! - **Retrying** failures with strategies selected per data type, service and error
//! - **Tracking** per-kind item counts, bytes and item errors in a job store
//! - **Resuming** interrupted jobs from their persisted worklist
//!
//! ## Architecture
//!
//! Porter follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Copier, idempotent executor, retries and job lifecycle
//! - [`adapters`] - Exporter/importer traits, local adapters, job stores, metrics
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use porter::adapters::local;
//! use porter::adapters::metrics::LoggingMetricRecorder;
//! use porter::adapters::registry::AdapterRegistry;
//! use porter::adapters::store::create_job_store;
//! use porter::adapters::traits::AuthData;
//! use porter::config::load_config;
//! use porter::core::job::JobRunner;
//! use porter::core::retry::SystemClock;
//! use porter::domain::{DataVertical, TransferJob};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("porter.toml")?;
//!     let store = create_job_store(&config.job_store).await?;
//!
//!     let mut registry = AdapterRegistry::new();
//!     local::register(&mut registry, "/data/in", "/data/out");
//!
//!     let job = TransferJob::new(DataVertical::Contacts, local::local_service(), local::local_service());
//!     store.create_job(&job).await?;
//!
//!     let runner = JobRunner::new(
//!         Arc::new(registry),
//!         store,
//!         Arc::new(LoggingMetricRecorder::new()),
//!         Arc::new(config.retry.build_library()?),
//!         Arc::new(SystemClock),
//!         config.transfer.clone(),
//!     );
//!     let outcome = runner.run(job.id, &AuthData::none(), &AuthData::none()).await?;
//!
//!     println!("Copied {} items", outcome.progress().total_items());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`]. A
//! [`domain::TransferError`] classifies itself as retryable, item-level or
//! job-fatal; the copier retries the first, records the second and stops
//! the job on the third:
//!
//! ```rust
//! use porter::domain::{FailureReason, TransferError};
//!
//! let err = TransferError::DestinationFull("quota exceeded".to_string());
//! assert!(err.is_fatal());
//! assert_eq!(err.failure_reason(), Some(FailureReason::DestinationFull));
//! ```
//!
//! ## Logging
//!
//! Porter uses structured logging with the `tracing` crate; every copy
//! event carries the job id:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(job_id = "7d44b88c", iteration = 3, "finished import");
//! warn!(job_id = "7d44b88c", stage = "export", "Skipping page");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
