//! Main configuration type.
//!
//! This module provides the top-level [`FeatherConfig`] struct and its builder.

use indexmap::IndexMap;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ConfigError, ConnectConfig, LoggingConfig, MetricsSection, ResourcesConfig, RestConfig};

/// Complete pipeline configuration.
///
/// Built once at startup and read-only afterwards. Use
/// [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use feather_config::FeatherConfig;
///
/// let config = FeatherConfig::default();
/// assert_eq!(config.connect.not_found, "/404.html");
/// assert_eq!(config.page_suffix, ".feather.html");
/// assert!(!config.resources.publish.gzip);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FeatherConfig {
    /// Directory static files and templated pages are served from.
    #[serde(default = "default_public_root")]
    pub public_root: PathBuf,

    /// URL regex → logical page name, checked in declaration order.
    #[serde(default)]
    pub page_routes: IndexMap<String, String>,

    /// Suffix that marks a templated page file.
    #[serde(default = "default_page_suffix")]
    pub page_suffix: String,

    /// Rewrite rules for the default router (URL regex → replacement).
    #[serde(default)]
    pub routes: IndexMap<String, String>,

    /// Request parsing collaborators.
    #[serde(default)]
    pub connect: ConnectConfig,

    /// Resource publishing options.
    #[serde(default)]
    pub resources: ResourcesConfig,

    /// REST sub-router options.
    #[serde(default)]
    pub rest: RestConfig,

    /// Render error details on error pages.
    #[serde(default)]
    pub debug: bool,

    /// Worker identifier reported in access log lines.
    #[serde(default)]
    pub worker_id: Option<u32>,

    /// Logging options.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics options.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for FeatherConfig {
    fn default() -> Self {
        Self {
            public_root: default_public_root(),
            page_routes: IndexMap::new(),
            page_suffix: default_page_suffix(),
            routes: IndexMap::new(),
            connect: ConnectConfig::default(),
            resources: ResourcesConfig::default(),
            rest: RestConfig::default(),
            debug: false,
            worker_id: None,
            logging: LoggingConfig::default(),
            metrics: MetricsSection::default(),
        }
    }
}

fn default_public_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_page_suffix() -> String {
    ".feather.html".to_string()
}

impl FeatherConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> FeatherConfigBuilder {
        FeatherConfigBuilder::new()
    }

    /// Create a development configuration preset.
    ///
    /// Debug error pages, pretty logs, and debug verbosity.
    ///
    /// ```
    /// use feather_config::FeatherConfig;
    ///
    /// let config = FeatherConfig::development();
    /// assert!(config.debug);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.debug = true;
        config.logging.level = feather_core::Level::Debug;
        config.logging.format = crate::LogFormat::Pretty;
        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs, gzip on, and no error detail in responses.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.resources.publish.gzip = true;
        config.logging.format = crate::LogFormat::Json;
        config
    }

    /// Validate the configuration.
    ///
    /// Every regex the pipeline will compile is compiled here once, so a bad
    /// pattern fails startup instead of the first request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an invalid regex, an invalid
    /// HTTP method in `connect.bodyParser.ignorePaths`, a 404 path or REST
    /// prefix that does not start with `/`, or an empty page suffix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (pattern, method) in &self.connect.body_parser.ignore_paths {
            check_regex("connect.bodyParser.ignorePaths", pattern)?;
            if !method.is_empty() && http::Method::from_bytes(method.as_bytes()).is_err() {
                return Err(ConfigError::invalid_value(
                    "connect.bodyParser.ignorePaths",
                    format!("invalid HTTP method {method:?} for {pattern}"),
                ));
            }
        }

        for pattern in self.page_routes.keys() {
            check_regex("pageRoutes", pattern)?;
        }

        for pattern in self.routes.keys() {
            check_regex("routes", pattern)?;
        }

        if !self.connect.not_found.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "connect.404",
                format!("must be an absolute URL path: {}", self.connect.not_found),
            ));
        }

        if !self.rest.prefix.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "rest.prefix",
                format!("must start with '/': {}", self.rest.prefix),
            ));
        }

        if self.page_suffix.is_empty() {
            return Err(ConfigError::invalid_value("pageSuffix", "must not be empty"));
        }

        if let Some(filter) = &self.logging.filter {
            feather_telemetry::logging::create_env_filter(filter)
                .map_err(|e| ConfigError::invalid_value("logging.filter", e.to_string()))?;
        }

        Ok(())
    }
}

fn check_regex(field: &str, pattern: &str) -> Result<(), ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|_| ())
        .map_err(|e| ConfigError::invalid_value(field, format!("{pattern}: {e}")))
}

/// Builder for [`FeatherConfig`].
#[derive(Debug, Default)]
pub struct FeatherConfigBuilder {
    config: FeatherConfig,
}

impl FeatherConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the public root directory.
    #[must_use]
    pub fn public_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.public_root = root.into();
        self
    }

    /// Add a page route (URL regex → logical page name).
    #[must_use]
    pub fn page_route(mut self, pattern: impl Into<String>, page: impl Into<String>) -> Self {
        self.config.page_routes.insert(pattern.into(), page.into());
        self
    }

    /// Add a rewrite rule for the default router.
    #[must_use]
    pub fn route(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.config.routes.insert(pattern.into(), replacement.into());
        self
    }

    /// Skip body parsing for requests matching `pattern` with `method`.
    #[must_use]
    pub fn ignore_body(mut self, pattern: impl Into<String>, method: impl Into<String>) -> Self {
        self.config
            .connect
            .body_parser
            .ignore_paths
            .insert(pattern.into(), method.into());
        self
    }

    /// Set the custom 404 page path.
    #[must_use]
    pub fn not_found(mut self, path: impl Into<String>) -> Self {
        self.config.connect.not_found = path.into();
        self
    }

    /// Set the cookie signing secret.
    #[must_use]
    pub fn cookie_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.connect.cookie_parser.secret = Some(secret.into());
        self
    }

    /// Enable or disable gzip.
    #[must_use]
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.config.resources.publish.gzip = enabled;
        self
    }

    /// Enable or disable debug error pages.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Set the worker identifier.
    #[must_use]
    pub fn worker_id(mut self, id: u32) -> Self {
        self.config.worker_id = Some(id);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> FeatherConfig {
        self.config
    }
}
