//! Logging bootstrap.
//!
//! Installs a `tracing` subscriber writing to a daily rolling file in the
//! configured log directory and, optionally, to stderr. `RUST_LOG` overrides
//! the configured level.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Log file name prefix; the appender adds the date.
pub const LOG_FILE_PREFIX: &str = "fleetmap.log";

/// Keeps the background log writer alive. Drop it last.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    /// Directory the log files are written to.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Errors installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to install logger: {0}")]
    Install(String),
}

/// Build the level filter: `RUST_LOG` if set, else `default_level`.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// File output is always on; `to_stderr` adds a human-readable console
/// layer for long-running commands.
pub fn init_logging(
    log_dir: &Path,
    default_level: &str,
    to_stderr: bool,
) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::Directory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(LocalTime::rfc_3339());

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(LocalTime::rfc_3339())
            .boxed()
    });

    tracing_subscriber::registry()
        .with(build_filter(default_level))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::info!(version = crate::VERSION, log_dir = %log_dir.display(), "Logging initialized");

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_dir: log_dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_level() {
        let filter = build_filter("debug");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_build_filter_falls_back_on_garbage() {
        let filter = build_filter("[[[not a directive");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_unwritable_directory_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = init_logging(&file.path().join("logs"), "info", false);
        assert!(matches!(result, Err(LoggingError::Directory { .. })));
    }
}
