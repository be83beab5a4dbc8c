//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Porter using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Porter - resumable data transfer between services
#[derive(Parser, Debug)]
#[command(name = "porter")]
#[command(version, about, long_about = None)]
#[command(author = "Porter Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "porter.toml", env = "PORTER_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PORTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy one data vertical between two local directory trees
    Transfer(commands::transfer::TransferArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show job state, item counts and errors
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_transfer() {
        let cli = Cli::parse_from([
            "porter",
            "transfer",
            "--source",
            "/in",
            "--destination",
            "/out",
            "--data-type",
            "photos",
        ]);
        assert_eq!(cli.config, "porter.toml");
        match cli.command {
            Commands::Transfer(args) => {
                assert_eq!(args.source, "/in");
                assert_eq!(args.destination, "/out");
                assert_eq!(args.data_type, crate::domain::DataVertical::Photos);
                assert!(args.job_id.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_transfer_rejects_unknown_data_type() {
        let result = Cli::try_parse_from([
            "porter",
            "transfer",
            "--source",
            "/in",
            "--destination",
            "/out",
            "--data-type",
            "faxes",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["porter", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["porter", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["porter", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_status_with_job() {
        let job_id = crate::domain::JobId::new();
        let cli = Cli::parse_from(["porter", "status", &job_id.to_string()]);
        match cli.command {
            Commands::Status(args) => assert_eq!(args.job_id, Some(job_id)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["porter", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
