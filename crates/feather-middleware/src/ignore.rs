//! Body-parser bypass rules.
//!
//! Rules come from `connect.bodyParser.ignorePaths` (path regex → method) and
//! are compiled once when the pipeline is built. Lookups are first-match over
//! declaration order.

use feather_config::ConfigError;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

/// Method assumed when a rule leaves it empty.
pub const DEFAULT_METHOD: &str = "get";

/// A single bypass rule.
#[derive(Debug, Clone)]
pub struct IgnorePathRule {
    raw_path: String,
    pattern: Regex,
    method: String,
}

impl IgnorePathRule {
    /// Compiles a rule. The pattern is case-insensitive; the method is
    /// lower-cased and defaults to `get` when empty.
    pub fn new(raw_path: &str, method: &str) -> Result<Self, ConfigError> {
        let pattern = RegexBuilder::new(raw_path)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ConfigError::invalid_value("connect.bodyParser.ignorePaths", format!("{raw_path}: {e}"))
            })?;

        let method = if method.trim().is_empty() {
            DEFAULT_METHOD.to_string()
        } else {
            method.trim().to_ascii_lowercase()
        };

        Ok(Self {
            raw_path: raw_path.to_string(),
            pattern,
            method,
        })
    }

    /// The pattern as written in configuration.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// The lower-cased method this rule applies to.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns true if the rule covers `path` requested with `method`.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method) && self.pattern.is_match(path)
    }
}

/// Ordered, immutable set of [`IgnorePathRule`]s.
///
/// # Example
///
/// ```
/// use feather_middleware::ignore::IgnorePathMatcher;
/// use indexmap::IndexMap;
///
/// let mut paths = IndexMap::new();
/// paths.insert("^/upload".to_string(), "post".to_string());
///
/// let matcher = IgnorePathMatcher::from_config(&paths).unwrap();
/// assert!(matcher.find("/upload/file", "POST").is_some());
/// assert!(matcher.find("/upload/file", "GET").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct IgnorePathMatcher {
    rules: Vec<IgnorePathRule>,
}

impl IgnorePathMatcher {
    /// Builds the rule set in declaration order.
    pub fn from_config(ignore_paths: &IndexMap<String, String>) -> Result<Self, ConfigError> {
        let rules = ignore_paths
            .iter()
            .map(|(path, method)| IgnorePathRule::new(path, method))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Returns the first rule matching the URL path and method.
    pub fn find(&self, path: &str, method: &str) -> Option<&IgnorePathRule> {
        self.rules.iter().find(|rule| rule.matches(path, method))
    }

    /// Returns the rules in declaration order.
    pub fn rules(&self) -> &[IgnorePathRule] {
        &self.rules
    }

    /// Returns true if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
