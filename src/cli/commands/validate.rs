//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Porter configuration file.

use crate::config::{load_config, JobStoreKind};
use crate::core::retry::RetryStrategy;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

fn describe(strategy: &RetryStrategy) -> String {
    match strategy {
        RetryStrategy::NoRetry => "no retry".to_string(),
        RetryStrategy::Skip => "skip".to_string(),
        RetryStrategy::Uniform {
            max_attempts,
            interval_ms,
        } => format!("uniform, {max_attempts} attempts every {interval_ms}ms"),
        RetryStrategy::ExponentialBackoff {
            max_attempts,
            initial_interval_ms,
            multiplier,
            max_interval_ms,
        } => format!(
            "exponential backoff, {max_attempts} attempts from {initial_interval_ms}ms x{multiplier} up to {max_interval_ms}ms"
        ),
    }
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Page Size: {}", config.transfer.page_size);
        println!(
            "  Concurrent Uploads: {}",
            config.transfer.max_concurrent_uploads
        );
        println!("  Upload Batch Size: {}", config.transfer.upload_batch_size);
        println!("  Default Retry: {}", describe(&config.retry.default));
        println!("  Retry Mappings: {}", config.retry.mappings.len());
        match config.job_store.kind {
            JobStoreKind::Memory => println!("  Job Store: memory"),
            JobStoreKind::File => println!("  Job Store: file ({})", config.job_store.path),
        }
        println!(
            "  Export Token: {}",
            if config.credentials.export_token.is_some() { "set" } else { "not set" }
        );
        println!(
            "  Import Token: {}",
            if config.credentials.import_token.is_some() { "set" } else { "not set" }
        );
        println!();
        Ok(0)
    }
}
