//! Transfer command implementation
//!
//! Copies one data vertical from a local source tree into a local
//! destination tree as a resumable job.

use super::{load_or_default, open_store};
use crate::adapters::local;
use crate::adapters::metrics::LoggingMetricRecorder;
use crate::adapters::registry::AdapterRegistry;
use crate::adapters::traits::AuthData;
use crate::config::{JobStoreKind, PorterConfig};
use crate::core::job::{JobOutcome, JobRunner};
use crate::core::retry::SystemClock;
use crate::domain::{DataVertical, JobId, TransferJob};
use clap::Args;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::watch;

/// How many job errors the summary lists before truncating
const MAX_LISTED_ERRORS: usize = 10;

/// Arguments for the transfer command
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Directory to export from
    #[arg(long)]
    pub source: String,

    /// Directory to import into
    #[arg(long)]
    pub destination: String,

    /// Data vertical to copy (photos, videos, media, contacts, calendar, mail, tasks)
    #[arg(long)]
    pub data_type: DataVertical,

    /// Resume an existing job instead of creating a new one
    #[arg(long)]
    pub job_id: Option<JobId>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl TransferArgs {
    /// Execute the transfer command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting transfer command");

        let config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }
        let library = match config.retry.build_library() {
            Ok(l) => Arc::new(l),
            Err(e) => {
                eprintln!("Invalid retry configuration: {e}");
                return Ok(2);
            }
        };

        if self.job_id.is_some() && config.job_store.kind == JobStoreKind::Memory {
            eprintln!("Resuming a job requires job_store.kind = \"file\"");
            return Ok(2);
        }

        let store = match open_store(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        let job = match self.job_id {
            Some(job_id) => match store.find_job(job_id).await? {
                Some(job) if job.data_type == self.data_type => {
                    tracing::info!(job_id = %job_id, state = ?job.state, "Resuming job");
                    job
                }
                Some(job) => {
                    eprintln!(
                        "Job {job_id} moves {}, not {}",
                        job.data_type, self.data_type
                    );
                    return Ok(2);
                }
                None => {
                    eprintln!("Job {job_id} not found in {}", config.job_store.path);
                    return Ok(2);
                }
            },
            None => TransferJob::new(self.data_type, local::local_service(), local::local_service()),
        };

        if !self.yes && !self.confirm(&config, &job)? {
            println!("Transfer cancelled.");
            return Ok(0);
        }

        if self.job_id.is_none() {
            store.create_job(&job).await?;
        }

        let mut registry = AdapterRegistry::new();
        local::register(&mut registry, &self.source, &self.destination);

        let runner = JobRunner::new(
            Arc::new(registry),
            store,
            Arc::new(LoggingMetricRecorder::new()),
            library,
            Arc::new(SystemClock),
            config.transfer.clone(),
        )
        .with_shutdown(shutdown_signal);

        println!("🚀 Starting transfer (job {})...", job.id);
        println!();

        let outcome = match runner
            .run(job.id, &export_auth(&config), &import_auth(&config))
            .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Transfer failed");
                eprintln!("Transfer failed: {e}");
                return Ok(5);
            }
        };

        print_summary(job.id, &outcome);
        Ok(exit_code(&outcome))
    }

    fn confirm(&self, config: &PorterConfig, job: &TransferJob) -> anyhow::Result<bool> {
        println!("Transfer Configuration:");
        println!("  Job: {}", job.id);
        println!("  Data type: {}", self.data_type);
        println!("  Source: {}", self.source);
        println!("  Destination: {}", self.destination);
        println!("  Page size: {}", config.transfer.page_size);
        println!(
            "  Concurrent uploads: {}",
            config.transfer.max_concurrent_uploads
        );
        println!();
        print!("Proceed with transfer? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("y"))
    }
}

fn export_auth(config: &PorterConfig) -> AuthData {
    config
        .credentials
        .export_token
        .clone()
        .map_or_else(AuthData::none, AuthData::bearer)
}

fn import_auth(config: &PorterConfig) -> AuthData {
    config
        .credentials
        .import_token
        .clone()
        .map_or_else(AuthData::none, AuthData::bearer)
}

fn print_summary(job_id: JobId, outcome: &JobOutcome) {
    let progress = outcome.progress();

    println!();
    println!("📊 Transfer Summary:");
    println!("  Job: {job_id}");
    for (kind, count) in &progress.counts {
        println!("  {kind}: {count}");
    }
    println!("  Total items: {}", progress.total_items());
    println!("  Bytes: {}", progress.bytes);
    println!("  Errors: {}", progress.errors.len());
    println!();

    if !progress.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in progress.errors.iter().take(MAX_LISTED_ERRORS) {
            println!("  - {} ({}): {}", error.title, error.id, error.exception);
        }
        if progress.errors.len() > MAX_LISTED_ERRORS {
            println!(
                "  ... and {} more errors",
                progress.errors.len() - MAX_LISTED_ERRORS
            );
        }
        println!();
    }

    match outcome {
        JobOutcome::Succeeded { .. } => println!("✅ Transfer completed successfully!"),
        JobOutcome::SucceededWithSkippedItems { .. } => {
            println!("⚠️  Transfer completed with skipped items")
        }
        JobOutcome::Failed {
            reason, message, ..
        } => {
            println!("❌ Transfer failed ({reason}): {message}");
        }
        JobOutcome::Cancelled { .. } => {
            println!("⚠️  Transfer interrupted. Progress saved.");
            println!("   Run again with --job-id {job_id} to resume.");
        }
    }
}

/// Process exit code for a job outcome
pub fn exit_code(outcome: &JobOutcome) -> i32 {
    match outcome {
        JobOutcome::Succeeded { .. } => 0,
        JobOutcome::SucceededWithSkippedItems { .. } => 1,
        JobOutcome::Failed { .. } => 5,
        // SIGINT exit code
        JobOutcome::Cancelled { .. } => 130,
    }
}
