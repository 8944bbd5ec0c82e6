//! Test fixtures for pipeline development and testing.
//!
//! # Example
//!
//! ```
//! use feather_core::fixtures::RecordingLogger;
//! use feather_core::{Level, Logger};
//!
//! let logger = RecordingLogger::new(Level::Info);
//! logger.info("http.server", "hello");
//! logger.debug("http.server", "dropped");
//!
//! assert_eq!(logger.messages("http.server"), vec!["hello".to_string()]);
//! ```

use crate::logger::{CategoryLevels, Level, Logger};
use parking_lot::Mutex;

/// A log entry captured by [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity of the entry.
    pub level: Level,
    /// Category the entry was logged under.
    pub category: String,
    /// The message text.
    pub message: String,
}

/// A [`Logger`] that keeps every accepted entry in memory.
#[derive(Debug)]
pub struct RecordingLogger {
    levels: CategoryLevels,
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    /// Creates a logger accepting `default` and above for every category.
    #[must_use]
    pub fn new(default: Level) -> Self {
        Self::with_levels(CategoryLevels::new(default))
    }

    /// Creates a logger with per-category thresholds.
    #[must_use]
    pub fn with_levels(levels: CategoryLevels) -> Self {
        Self {
            levels,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all captured entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Returns the messages logged under a category, in order.
    #[must_use]
    pub fn messages(&self, category: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Drops all captured entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Logger for RecordingLogger {
    fn is_enabled(&self, level: Level, category: &str) -> bool {
        self.levels.is_enabled(level, category)
    }

    fn log(&self, level: Level, category: &str, message: &str) {
        if !self.is_enabled(level, category) {
            return;
        }
        self.entries.lock().push(LogEntry {
            level,
            category: category.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger_filters_by_category() {
        let logger = RecordingLogger::with_levels(
            CategoryLevels::new(Level::Warn).with("http.access", Level::Info),
        );

        logger.info("http.access", "line");
        logger.info("http.server", "dropped");
        logger.error("uncaught", "boom");

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, "http.access");
        assert_eq!(entries[1].level, Level::Error);
    }

    #[test]
    fn test_clear() {
        let logger = RecordingLogger::new(Level::Trace);
        logger.trace("a", "b");
        logger.clear();
        assert!(logger.entries().is_empty());
    }
}
