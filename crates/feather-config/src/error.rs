//! Configuration errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to load or validate a [`FeatherConfig`](crate::FeatherConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file {}", path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The document is not valid TOML/JSON or has unknown keys.
    #[error("malformed {format} configuration: {message}")]
    Parse {
        /// `"TOML"` or `"JSON"`.
        format: &'static str,
        /// Parser message, including the offending key or position.
        message: String,
    },

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format {0:?}")]
    UnsupportedFormat(String),

    /// A value that parsed but cannot be used, such as a regex that does not
    /// compile.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path as written in the file.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override that could not be applied.
    #[error("cannot apply {var}: {reason}")]
    EnvOverride {
        /// The variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an environment-override error.
    pub fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if a configuration file did not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse {
            format: "TOML",
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse {
            format: "JSON",
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_detected() {
        let err = ConfigError::read(
            "/etc/feather/feather.toml",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "cannot read configuration file /etc/feather/feather.toml"
        );

        let denied = ConfigError::read("x.toml", io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(!denied.is_not_found());
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid_value("connect.bodyParser.ignorePaths", "^/up(: unclosed group");
        assert_eq!(
            err.to_string(),
            "invalid value for connect.bodyParser.ignorePaths: ^/up(: unclosed group"
        );
    }

    #[test]
    fn test_parse_errors_name_format() {
        let err = ConfigError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        assert!(matches!(err, ConfigError::Parse { format: "JSON", .. }));
    }
}
