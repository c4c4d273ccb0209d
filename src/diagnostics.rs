//! Tracing subscriber setup for the ambient host.
//!
//! Logs always go to stderr. With `logging.file` (or an explicit
//! `logging.directory`) they are also written, without ANSI colours, to a
//! daily-rotated file, by default under `meilin_dirs::logs_dir()`.

use crate::config::LoggingConfig;
use crate::error::{MeiLinError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// File name prefix for rotated logs (`meilin-ambient.log.2026-01-31`).
pub const LOG_FILE_PREFIX: &str = "meilin-ambient.log";

/// Parse an `EnvFilter` directive string.
///
/// # Errors
///
/// Returns [`MeiLinError::Config`] if a directive does not parse.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| MeiLinError::Config(format!("invalid logging.filter {directives:?}: {e}")))
}

/// `RUST_LOG` when set, otherwise the configured filter.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.filter),
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process, or buffered
/// file output is lost on exit.
///
/// # Errors
///
/// Fails on an invalid filter, an uncreatable log directory, or if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match config.file_directory() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MeiLinError::Runtime(format!("cannot install tracing subscriber: {e}")))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(parse_filter(&LoggingConfig::default().filter).is_ok());
    }

    #[test]
    fn bad_level_is_config_error() {
        let err = parse_filter("meilin=loudest").unwrap_err();
        assert!(matches!(err, MeiLinError::Config(_)));
        assert!(err.to_string().contains("logging.filter"));
    }
}
