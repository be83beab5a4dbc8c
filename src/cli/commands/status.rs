//! Status command implementation
//!
//! Lists the jobs in the configured job store, or shows one job's item
//! counts and errors.

use super::{load_or_default, open_store};
use crate::adapters::store::JobStore;
use crate::domain::{JobId, JobState, TransferJob};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show the details of one job
    pub job_id: Option<JobId>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking job status");

        println!("📊 Job Status");
        println!();

        let config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let store = match open_store(&config).await {
            Ok(s) => s,
            Err(code) => return Ok(code),
        };

        match self.job_id {
            Some(job_id) => show_job(store.as_ref(), job_id).await,
            None => list_jobs(store.as_ref()).await,
        }
    }
}

fn state_label(job: &TransferJob) -> String {
    match job.state {
        JobState::New => "⏸️  New".to_string(),
        JobState::InProgress => "🔄 In Progress".to_string(),
        JobState::Complete => "✅ Complete".to_string(),
        JobState::Canceled => "⏹️  Canceled".to_string(),
        JobState::Error => match job.failure_reason {
            Some(reason) => format!("❌ Error ({reason})"),
            None => "❌ Error".to_string(),
        },
    }
}

async fn list_jobs(store: &dyn JobStore) -> anyhow::Result<i32> {
    let mut jobs = match store.list_jobs().await {
        Ok(j) => j,
        Err(e) => {
            println!("❌ Failed to list jobs");
            println!("   Error: {e}");
            return Ok(5);
        }
    };

    if jobs.is_empty() {
        println!("No jobs found.");
        println!("Run 'porter transfer' to start a job.");
        return Ok(0);
    }

    jobs.sort_by_key(|j| j.created_at);
    println!("Found {} job(s):", jobs.len());
    println!();
    println!(
        "{:<38} {:<10} {:<28} {:<20}",
        "Job ID", "Data Type", "State", "Updated"
    );
    println!("{}", "-".repeat(100));

    for job in &jobs {
        println!(
            "{:<38} {:<10} {:<28} {:<20}",
            job.id.to_string(),
            job.data_type.as_str(),
            state_label(job),
            job.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!();
    Ok(0)
}

async fn show_job(store: &dyn JobStore, job_id: JobId) -> anyhow::Result<i32> {
    let Some(job) = store.find_job(job_id).await? else {
        println!("❌ Job {job_id} not found");
        return Ok(2);
    };
    let progress = store.job_progress(job_id).await?;

    println!("Job: {}", job.id);
    println!("  Data type: {}", job.data_type);
    println!("  Export service: {}", job.export_service);
    println!("  Import service: {}", job.import_service);
    println!("  State: {}", state_label(&job));
    println!("  Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated: {}", job.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!();

    println!("Items:");
    if progress.counts.is_empty() {
        println!("  (none)");
    }
    for (kind, count) in &progress.counts {
        println!("  {kind}: {count}");
    }
    println!("  Bytes: {}", progress.bytes);
    println!();

    if !progress.errors.is_empty() {
        println!("Errors ({}):", progress.errors.len());
        for error in &progress.errors {
            let marker = if error.can_skip { "skipped" } else { "failed" };
            println!("  - [{marker}] {} ({}): {}", error.title, error.id, error.exception);
        }
        println!();
    }

    Ok(0)
}
