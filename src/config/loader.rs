//! Reads `porter.toml`
//!
//! Order of operations: `${VAR}` substitution on the raw text, TOML
//! parsing, `PORTER_<SECTION>_<KEY>` overrides, then validation.

use super::schema::{JobStoreKind, PorterConfig};
use super::secret::secret_string_opt;
use crate::domain::{Result, TransferError};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

/// Loads and validates a configuration file
///
/// # Errors
///
/// Returns [`TransferError::Configuration`] when the file is missing or
/// unreadable, is not valid TOML, references an unset `${VAR}`, or fails
/// validation.
///
/// ```no_run
/// use porter::config::loader::load_config;
///
/// let config = load_config("porter.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PorterConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        let why = match e.kind() {
            ErrorKind::NotFound => "does not exist".to_string(),
            _ => format!("cannot be read: {e}"),
        };
        TransferError::Configuration(format!("Configuration file {} {why}", path.display()))
    })?;

    parse_config(&contents)
}

/// [`load_config`] for text already in memory
pub fn parse_config(contents: &str) -> Result<PorterConfig> {
    let expanded = substitute_env_vars(contents)?;

    let mut config: PorterConfig = toml::from_str(&expanded)
        .map_err(|e| TransferError::Configuration(format!("Invalid TOML: {e}")))?;
    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        TransferError::Configuration(format!("Configuration validation failed: {e}"))
    })?;
    Ok(config)
}

/// Expands `${NAME}` from the environment, leaving comment lines alone
fn substitute_env_vars(input: &str) -> Result<String> {
    let pattern = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TransferError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut unset = BTreeSet::new();

    let expanded: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            pattern
                .replace_all(line, |caps: &Captures<'_>| {
                    std::env::var(&caps[1]).unwrap_or_else(|_| {
                        unset.insert(caps[1].to_string());
                        String::new()
                    })
                })
                .into_owned()
        })
        .collect();

    if unset.is_empty() {
        Ok(expanded.join("\n"))
    } else {
        let names: Vec<String> = unset.into_iter().collect();
        Err(TransferError::Configuration(format!(
            "Environment variables referenced but not set: {}",
            names.join(", ")
        )))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>> {
    env_value(name)
        .map(|raw| {
            raw.trim().parse().map_err(|_| {
                TransferError::Configuration(format!("{name}={raw} is not a valid value"))
            })
        })
        .transpose()
}

fn parse_store_kind(raw: &str) -> Result<JobStoreKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(JobStoreKind::Memory),
        "file" => Ok(JobStoreKind::File),
        _ => Err(TransferError::Configuration(format!(
            "PORTER_JOB_STORE_KIND={raw} is not a valid value (memory or file)"
        ))),
    }
}

/// `PORTER_<SECTION>_<KEY>` overrides, e.g. `PORTER_TRANSFER_PAGE_SIZE`
fn apply_env_overrides(config: &mut PorterConfig) -> Result<()> {
    if let Some(level) = env_value("PORTER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = level;
    }

    let transfer = &mut config.transfer;
    if let Some(n) = env_parsed("PORTER_TRANSFER_MAX_CONCURRENT_UPLOADS")? {
        transfer.max_concurrent_uploads = n;
    }
    if let Some(n) = env_parsed("PORTER_TRANSFER_UPLOAD_BATCH_SIZE")? {
        transfer.upload_batch_size = n;
    }
    if let Some(n) = env_parsed("PORTER_TRANSFER_PAGE_SIZE")? {
        transfer.page_size = n;
    }

    if let Some(kind) = env_value("PORTER_JOB_STORE_KIND") {
        config.job_store.kind = parse_store_kind(&kind)?;
    }
    if let Some(path) = env_value("PORTER_JOB_STORE_PATH") {
        config.job_store.path = path;
    }

    if let Some(token) = env_value("PORTER_CREDENTIALS_EXPORT_TOKEN") {
        config.credentials.export_token = secret_string_opt(Some(token));
    }
    if let Some(token) = env_value("PORTER_CREDENTIALS_IMPORT_TOKEN") {
        config.credentials.import_token = secret_string_opt(Some(token));
    }

    if let Some(enabled) = env_parsed("PORTER_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Some(path) = env_value("PORTER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = path;
    }
    if let Some(rotation) = env_value("PORTER_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = rotation;
    }

    Ok(())
}
