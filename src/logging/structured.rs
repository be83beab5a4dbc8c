//! Subscriber setup
//!
//! Operators read the console layer. When `logging.local_enabled` is set a
//! second layer writes one JSON object per event into a rotating file
//! under `logging.local_path`, named `porter.log.<period>`.

use crate::config::LoggingConfig;
use crate::domain::{Result, TransferError};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log file name prefix inside `logging.local_path`
pub const LOG_FILE_PREFIX: &str = "porter.log";

const LEVEL_NAMES: [(&str, Level); 5] = [
    ("trace", Level::TRACE),
    ("debug", Level::DEBUG),
    ("info", Level::INFO),
    ("warn", Level::WARN),
    ("error", Level::ERROR),
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the file writer's background worker alive; drop it last so
/// buffered events reach disk
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    worker: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// True when events are also written to a log file
    pub fn writes_file(&self) -> bool {
        self.worker.is_some()
    }
}

/// Installs the global subscriber
///
/// `RUST_LOG` takes precedence over `log_level_str` when set.
///
/// # Errors
///
/// Returns a configuration error for an unknown level, an unusable log
/// directory, or when a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use porter::logging::init_logging;
/// use porter::config::LoggingConfig;
///
/// let config = LoggingConfig::default();
/// let _guard = init_logging("info", &config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level_str: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(log_level_str)?;

    let mut layers: Vec<BoxedLayer> = vec![tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(level_filter(level))
        .boxed()];

    let worker = if config.local_enabled {
        let (layer, worker) = json_file_layer(config, level)?;
        layers.push(layer);
        Some(worker)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| TransferError::Configuration(format!("Failed to install logger: {e}")))?;

    tracing::debug!(
        level = %level,
        file = config.local_enabled,
        directory = %config.local_path,
        rotation = %config.local_rotation,
        "Logging ready"
    );

    Ok(LoggingGuard { worker })
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("porter={}", level.as_str().to_lowercase())))
}

fn json_file_layer(config: &LoggingConfig, level: Level) -> Result<(BoxedLayer, WorkerGuard)> {
    let directory = Path::new(&config.local_path);
    std::fs::create_dir_all(directory).map_err(|e| {
        TransferError::Configuration(format!(
            "Log directory {} is not usable: {e}",
            directory.display()
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation_for(&config.local_rotation),
        directory,
        LOG_FILE_PREFIX,
    );
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_thread_ids(true)
        .with_writer(writer)
        .with_filter(level_filter(level))
        .boxed();
    Ok((layer, worker))
}

fn rotation_for(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

/// Maps a level name, in any case, to a [`Level`]
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    let wanted = level_str.trim().to_ascii_lowercase();
    LEVEL_NAMES
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, level)| *level)
        .ok_or_else(|| {
            let known: Vec<&str> = LEVEL_NAMES.iter().map(|(name, _)| *name).collect();
            TransferError::Configuration(format!(
                "Unknown log level '{level_str}', expected one of {}",
                known.join(", ")
            ))
        })
}
