//! Category-aware logging contract.
//!
//! The pipeline logs through a [`Logger`] resolved from the shared cache rather
//! than calling `tracing` directly, so a deployment can swap or rotate the
//! logger at runtime and gate whole stages on a category's verbosity (the
//! access log is only installed when `http.access` is enabled at `info`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Log severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Very fine-grained diagnostics.
    Trace,
    /// Debugging information.
    Debug,
    /// Normal operational messages.
    Info,
    /// Something unexpected but recoverable.
    Warn,
    /// A failure.
    Error,
    /// Logging disabled.
    Off,
}

impl Level {
    /// Returns the lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }

    /// Returns true if a message at `level` passes a threshold of `self`.
    #[must_use]
    pub fn allows(self, level: Self) -> bool {
        self != Self::Off && level != Self::Off && level >= self
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" | "none" => Ok(Self::Off),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

/// Structured logger with named categories.
pub trait Logger: Send + Sync + 'static {
    /// Returns true if `category` is enabled at `level`.
    fn is_enabled(&self, level: Level, category: &str) -> bool;

    /// Emits a message. Implementations drop messages below the category threshold.
    fn log(&self, level: Level, category: &str, message: &str);

    /// Emits a trace message.
    fn trace(&self, category: &str, message: &str) {
        self.log(Level::Trace, category, message);
    }

    /// Emits a debug message.
    fn debug(&self, category: &str, message: &str) {
        self.log(Level::Debug, category, message);
    }

    /// Emits an info message.
    fn info(&self, category: &str, message: &str) {
        self.log(Level::Info, category, message);
    }

    /// Emits a warning.
    fn warn(&self, category: &str, message: &str) {
        self.log(Level::Warn, category, message);
    }

    /// Emits an error.
    fn error(&self, category: &str, message: &str) {
        self.log(Level::Error, category, message);
    }
}

/// A logger shared between the pipeline and the cache.
pub type SharedLogger = Arc<dyn Logger>;

/// Per-category verbosity thresholds.
///
/// Categories are dotted paths. A lookup walks from the full category up its
/// parents (`http.access.headers` → `http.access` → `http`) and falls back to
/// the default threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLevels {
    default: Level,
    overrides: HashMap<String, Level>,
}

impl CategoryLevels {
    /// Creates a table where every category uses `default`.
    #[must_use]
    pub fn new(default: Level) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Sets the threshold for a category and its children.
    #[must_use]
    pub fn with(mut self, category: impl Into<String>, level: Level) -> Self {
        self.set(category, level);
        self
    }

    /// Sets the threshold for a category and its children.
    pub fn set(&mut self, category: impl Into<String>, level: Level) {
        self.overrides.insert(category.into(), level);
    }

    /// Returns the default threshold.
    #[must_use]
    pub const fn default_level(&self) -> Level {
        self.default
    }

    /// Returns the effective threshold for a category.
    #[must_use]
    pub fn threshold(&self, category: &str) -> Level {
        let mut current = category;
        loop {
            if let Some(level) = self.overrides.get(current) {
                return *level;
            }
            match current.rfind('.') {
                Some(idx) => current = &current[..idx],
                None => return self.default,
            }
        }
    }

    /// Returns true if `category` is enabled at `level`.
    #[must_use]
    pub fn is_enabled(&self, level: Level, category: &str) -> bool {
        self.threshold(category).allows(level)
    }
}

impl Default for CategoryLevels {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}
