//! Configuration schema types.
//!
//! Keys are camelCase so existing application config files keep working
//! (`publicRoot`, `connect.bodyParser.ignorePaths`, `connect["404"]`, ...).

use feather_core::Level;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Request parsing collaborators (`connect` section).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectConfig {
    /// Body parser settings.
    #[serde(default)]
    pub body_parser: BodyParserConfig,

    /// Cookie parser settings.
    #[serde(default)]
    pub cookie_parser: CookieParserConfig,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Path of the custom 404 page.
    #[serde(rename = "404", default = "default_not_found")]
    pub not_found: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            body_parser: BodyParserConfig::default(),
            cookie_parser: CookieParserConfig::default(),
            session: SessionConfig::default(),
            not_found: default_not_found(),
        }
    }
}

fn default_not_found() -> String {
    "/404.html".to_string()
}

/// Body parser settings.
///
/// # Example
///
/// ```
/// use feather_config::BodyParserConfig;
///
/// let mut config = BodyParserConfig::default();
/// config.ignore_paths.insert("^/upload".to_string(), "post".to_string());
/// assert_eq!(config.ignore_paths["^/upload"], "post");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct BodyParserConfig {
    /// Path regex → HTTP method for which body parsing is skipped.
    ///
    /// An empty method means `get`. Declaration order is preserved.
    #[serde(default)]
    pub ignore_paths: IndexMap<String, String>,

    /// Maximum accepted body size in bytes.
    #[serde(default = "default_body_limit")]
    pub limit_bytes: usize,
}

impl Default for BodyParserConfig {
    fn default() -> Self {
        Self {
            ignore_paths: IndexMap::new(),
            limit_bytes: default_body_limit(),
        }
    }
}

fn default_body_limit() -> usize {
    1024 * 1024
}

/// Cookie parser settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CookieParserConfig {
    /// Secret used for signed cookies.
    #[serde(default)]
    pub secret: Option<String>,
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_session_cookie")]
    pub cookie_name: String,

    /// Cookie path attribute.
    #[serde(default = "default_session_path")]
    pub path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie(),
            path: default_session_path(),
        }
    }
}

fn default_session_cookie() -> String {
    "feather.sid".to_string()
}

fn default_session_path() -> String {
    "/".to_string()
}

/// Resource publishing settings (`resources` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ResourcesConfig {
    /// Publishing options.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Publishing options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PublishConfig {
    /// Compress responses and serve precompressed static files.
    #[serde(default)]
    pub gzip: bool,
}

/// REST sub-router settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RestConfig {
    /// URL prefix under which REST resources are mounted.
    #[serde(default = "default_rest_prefix")]
    pub prefix: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            prefix: default_rest_prefix(),
        }
    }
}

fn default_rest_prefix() -> String {
    "/_rest".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

/// Logging settings.
///
/// # Example
///
/// ```
/// use feather_config::LoggingConfig;
/// use feather_core::Level;
///
/// let mut config = LoggingConfig::default();
/// config.categories.insert("http.access".to_string(), Level::Warn);
///
/// let levels = config.category_levels();
/// assert_eq!(levels.threshold("http.access"), Level::Warn);
/// assert_eq!(levels.threshold("http.server"), Level::Info);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Whether to install a global subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default threshold for every category.
    #[serde(default = "default_level")]
    pub level: Level,

    /// Optional `EnvFilter` directive; defaults to `level`.
    #[serde(default)]
    pub filter: Option<String>,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Per-category thresholds (`http.access`, `http.access.headers`, ...).
    #[serde(default)]
    pub categories: IndexMap<String, Level>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            filter: None,
            format: LogFormat::default(),
            categories: IndexMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Builds the category threshold table.
    #[must_use]
    pub fn category_levels(&self) -> feather_core::CategoryLevels {
        self.categories.iter().fold(
            feather_core::CategoryLevels::new(self.level),
            |levels, (category, level)| levels.with(category.clone(), *level),
        )
    }

    /// Converts to the subscriber configuration.
    #[must_use]
    pub fn to_log_config(&self) -> feather_telemetry::LogConfig {
        feather_telemetry::LogConfig {
            enabled: self.enabled,
            level: self
                .filter
                .clone()
                .unwrap_or_else(|| self.level.as_str().to_string()),
            format: match self.format {
                LogFormat::Json => feather_telemetry::LogFormat::Json,
                LogFormat::Pretty => feather_telemetry::LogFormat::Pretty,
                LogFormat::Compact => feather_telemetry::LogFormat::Compact,
            },
            ..feather_telemetry::LogConfig::default()
        }
    }
}

fn default_level() -> Level {
    Level::Info
}

fn default_true() -> bool {
    true
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MetricsSection {
    /// Enable the Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

impl MetricsSection {
    /// Converts to the exporter configuration.
    #[must_use]
    pub fn to_metrics_config(&self) -> feather_telemetry::MetricsConfig {
        feather_telemetry::MetricsConfig {
            enabled: self.enabled,
            addr: self.addr.clone(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_defaults() {
        let connect = ConnectConfig::default();
        assert_eq!(connect.not_found, "/404.html");
        assert!(connect.body_parser.ignore_paths.is_empty());
        assert_eq!(connect.session.cookie_name, "feather.sid");
        assert!(connect.cookie_parser.secret.is_none());
    }

    #[test]
    fn test_not_found_key_is_404() {
        let connect: ConnectConfig = serde_json::from_str(r#"{"404": "/missing.html"}"#).unwrap();
        assert_eq!(connect.not_found, "/missing.html");
    }

    #[test]
    fn test_ignore_paths_preserve_order() {
        let json = r#"{"ignorePaths": {"^/z": "post", "^/a": "", "^/m": "PUT"}}"#;
        let parser: BodyParserConfig = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = parser.ignore_paths.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["^/z", "^/a", "^/m"]);
    }

    #[test]
    fn test_logging_to_log_config() {
        let logging = LoggingConfig {
            format: LogFormat::Pretty,
            level: Level::Debug,
            ..Default::default()
        };
        let log_config = logging.to_log_config();
        assert_eq!(log_config.level, "debug");
        assert_eq!(log_config.format, feather_telemetry::LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<PublishConfig, _> = serde_json::from_str(r#"{"gzipp": true}"#);
        assert!(result.is_err());
    }
}
