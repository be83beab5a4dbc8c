// Porter - Resumable Data Transfer Engine
// Copyright (c) 2025 Porter Contributors
// Licensed under the MIT License

use clap::Parser;
use porter::cli::{Cli, Commands};
use porter::config::{load_config, LoggingConfig};
use porter::logging::{init_logging, LoggingGuard};
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let guard = match start_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Unable to start logging: {e}");
            process::exit(5);
        }
    };
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), config = %cli.config, "porter starting");

    let (stop, stopped) = watch::channel(false);
    tokio::spawn(async move {
        if let Some(signal) = shutdown_signal().await {
            tracing::warn!(signal, "Shutdown requested, stopping after the current page");
            eprintln!("\n⚠️  {signal} received, stopping after the current page...");
            stop.send_replace(true);
        }
    });

    let code = run(&cli, stopped).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        5
    });

    // The file writer flushes on drop; process::exit skips destructors
    drop(guard);
    process::exit(code);
}

/// Console logging always; the configured log file only for transfers
fn start_logging(cli: &Cli) -> porter::domain::Result<LoggingGuard> {
    let config = load_config(&cli.config).ok();
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let logging = match (&cli.command, config) {
        (Commands::Transfer(_), Some(config)) => config.logging,
        _ => LoggingConfig {
            local_enabled: false,
            ..LoggingConfig::default()
        },
    };
    init_logging(&level, &logging)
}

#[cfg(unix)]
async fn shutdown_signal() -> Option<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
            return tokio::signal::ctrl_c().await.ok().map(|()| "SIGINT");
        }
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.ok().map(|()| "SIGINT"),
        _ = terminate.recv() => Some("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Option<&'static str> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Some("Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            None
        }
    }
}

async fn run(cli: &Cli, shutdown: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Transfer(args) => args.execute(&cli.config, shutdown).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
