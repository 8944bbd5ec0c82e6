//! Structured logging for Feather.
//!
//! Two pieces live here:
//!
//! - [`init_logging`] installs a global `tracing-subscriber` (JSON for
//!   production, pretty or compact for development).
//! - [`TracingLogger`] is the pipeline's [`Logger`] implementation. Every
//!   message becomes a `tracing` event with a `category` field, gated first by
//!   a per-category threshold table so whole stages can be switched on or off
//!   by category.
//!
//! # Example
//!
//! ```rust,ignore
//! use feather_telemetry::logging::{init_logging, LogConfig, TracingLogger};
//! use feather_core::{CategoryLevels, Level, Logger};
//!
//! init_logging(&LogConfig::default())?;
//!
//! let logger = TracingLogger::new(CategoryLevels::new(Level::Info));
//! logger.info("http.server", "listening");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use feather_core::{CategoryLevels, Level, Logger};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Target used for events emitted through [`TracingLogger`].
pub const LOG_TARGET: &str = "feather";

/// Output format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "feather=debug,tokio=warn").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            file_line_info: true,
            include_target: true,
        }
    }
}

/// Initializes the global logging subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a bad filter and
/// `TelemetryError::Subscriber` if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .map_err(TelemetryError::from)
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// [`Logger`] backed by `tracing` events.
///
/// Category thresholds are checked before the event is built; the global
/// subscriber's own filter still applies afterwards.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    levels: CategoryLevels,
}

impl TracingLogger {
    /// Creates a logger with the given category thresholds.
    #[must_use]
    pub fn new(levels: CategoryLevels) -> Self {
        Self { levels }
    }

    /// Returns the category threshold table.
    #[must_use]
    pub fn levels(&self) -> &CategoryLevels {
        &self.levels
    }
}

impl Logger for TracingLogger {
    fn is_enabled(&self, level: Level, category: &str) -> bool {
        self.levels.is_enabled(level, category)
    }

    fn log(&self, level: Level, category: &str, message: &str) {
        if !self.is_enabled(level, category) {
            return;
        }
        match level {
            Level::Trace => tracing::trace!(target: LOG_TARGET, category, "{message}"),
            Level::Debug => tracing::debug!(target: LOG_TARGET, category, "{message}"),
            Level::Info => tracing::info!(target: LOG_TARGET, category, "{message}"),
            Level::Warn => tracing::warn!(target: LOG_TARGET, category, "{message}"),
            Level::Error => tracing::error!(target: LOG_TARGET, category, "{message}"),
            Level::Off => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_create_env_filter_valid() {
        assert!(create_env_filter("info,feather=debug").is_ok());
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_tracing_logger_category_gate() {
        let logger = TracingLogger::new(
            CategoryLevels::new(Level::Warn).with("http.access", Level::Info),
        );

        assert!(logger.is_enabled(Level::Info, "http.access"));
        assert!(!logger.is_enabled(Level::Trace, "http.access.headers"));
        assert!(!logger.is_enabled(Level::Info, "http.server"));

        // No subscriber installed; must not panic.
        logger.info("http.access", "127.0.0.1 - 0: - [..]");
        logger.error("uncaught", "boom");
    }
}
