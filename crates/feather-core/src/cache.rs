//! Shared dependency cache.
//!
//! Pipeline construction resolves its dependencies by name (`"files"`,
//! `"logger"`, `"router"`) through a [`SharedCache`]. Values are type-erased
//! and downcast at the call site with [`downcast`].
//!
//! # Example
//!
//! ```rust
//! use feather_core::cache::{self, MemoryCache, SharedCache};
//!
//! # tokio_test::block_on(async {
//! let cache = MemoryCache::new();
//! cache.insert("greeting", String::from("hello"));
//!
//! let value = cache.get("greeting").await.unwrap();
//! let greeting = cache::downcast::<String>("greeting", value).unwrap();
//! assert_eq!(greeting.as_str(), "hello");
//! # });
//! ```

use crate::BoxFuture;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Well-known cache keys.
pub mod keys {
    /// The file index (templated pages and REST resources).
    pub const FILES: &str = "files";
    /// The active logger.
    pub const LOGGER: &str = "logger";
    /// The router stage.
    pub const ROUTER: &str = "router";
}

/// A type-erased cache entry.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Errors raised while resolving cache entries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// No entry is stored under the key.
    #[error("cache item not found: {0}")]
    Missing(String),

    /// The entry exists but holds a different type.
    #[error("cache item {key} is not a {expected}")]
    TypeMismatch {
        /// The key that was looked up.
        key: String,
        /// The requested type name.
        expected: &'static str,
    },

    /// The backing store failed.
    #[error("cache backend failure for {key}: {reason}")]
    Backend {
        /// The key that was looked up.
        key: String,
        /// Description of the failure.
        reason: String,
    },
}

impl CacheError {
    /// The key whose lookup failed.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Missing(key) | Self::TypeMismatch { key, .. } | Self::Backend { key, .. } => key,
        }
    }
}

/// Asynchronous named lookups.
///
/// Implementations must be safe to share between concurrent requests.
pub trait SharedCache: Send + Sync + 'static {
    /// Resolves a single entry.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<CacheValue, CacheError>>;

    /// Resolves several entries at once. Fails if any key is missing.
    fn get_many<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, Result<HashMap<String, CacheValue>, CacheError>>;
}

/// Downcasts a cache entry to a concrete type.
pub fn downcast<T: Send + Sync + 'static>(key: &str, value: CacheValue) -> Result<Arc<T>, CacheError> {
    value.downcast::<T>().map_err(|_| CacheError::TypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

/// Resolves and downcasts a single entry.
pub async fn get_as<T: Send + Sync + 'static>(
    cache: &dyn SharedCache,
    key: &str,
) -> Result<Arc<T>, CacheError> {
    let value = cache.get(key).await?;
    downcast(key, value)
}

/// In-process cache backed by a read-write lock.
///
/// Entries can be replaced at any time (e.g. when the logger is rotated);
/// readers always observe either the old or the new value.
#[derive(Default)]
pub struct MemoryCache {
    items: RwLock<HashMap<String, CacheValue>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous entry.
    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.insert_value(key, Arc::new(value));
    }

    /// Stores an already type-erased value.
    pub fn insert_value(&self, key: impl Into<String>, value: CacheValue) {
        let key = key.into();
        tracing::trace!(key = %key, "cache item stored");
        self.items.write().insert(key, value);
    }

    /// Removes an entry, returning it if present.
    pub fn remove(&self, key: &str) -> Option<CacheValue> {
        self.items.write().remove(key)
    }

    /// Returns true if an entry is stored under the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items = self.items.read();
        let mut keys: Vec<&String> = items.keys().collect();
        keys.sort();
        f.debug_struct("MemoryCache").field("keys", &keys).finish()
    }
}

impl SharedCache for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<CacheValue, CacheError>> {
        Box::pin(async move {
            self.items
                .read()
                .get(key)
                .cloned()
                .ok_or_else(|| CacheError::Missing(key.to_string()))
        })
    }

    fn get_many<'a>(
        &'a self,
        keys: &'a [&'a str],
    ) -> BoxFuture<'a, Result<HashMap<String, CacheValue>, CacheError>> {
        Box::pin(async move {
            let items = self.items.read();
            let resolved: Result<HashMap<String, CacheValue>, CacheError> = keys
                .iter()
                .map(|key| {
                    items
                        .get(*key)
                        .cloned()
                        .map(|value| ((*key).to_string(), value))
                        .ok_or_else(|| CacheError::Missing((*key).to_string()))
                })
                .collect();
            resolved
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = MemoryCache::new();
        let err = cache.get("logger").await.unwrap_err();
        assert_eq!(err, CacheError::Missing("logger".to_string()));
    }

    #[test]
    fn test_error_key() {
        assert_eq!(CacheError::Missing("files".into()).key(), "files");
        let err = CacheError::TypeMismatch {
            key: "logger".into(),
            expected: "Logger",
        };
        assert_eq!(err.key(), "logger");
    }

    #[tokio::test]
    async fn test_get_many_resolves_all_keys() {
        let cache = MemoryCache::new();
        cache.insert("a", 1_u32);
        cache.insert("b", "two");

        let items = cache.get_many(&["a", "b"]).await.unwrap();
        assert_eq!(items.len(), 2);
        let a = downcast::<u32>("a", items["a"].clone()).unwrap();
        assert_eq!(*a, 1);
    }

    #[tokio::test]
    async fn test_get_many_fails_atomically() {
        let cache = MemoryCache::new();
        cache.insert("files", 1_u8);

        let err = cache.get_many(&["files", "logger"]).await.unwrap_err();
        assert_eq!(err, CacheError::Missing("logger".to_string()));
    }

    #[tokio::test]
    async fn test_downcast_type_mismatch() {
        let cache = MemoryCache::new();
        cache.insert("router", 5_i64);

        let err = get_as::<String>(&cache, "router").await.unwrap_err();
        assert!(matches!(err, CacheError::TypeMismatch { ref key, .. } if key == "router"));
    }

    #[test]
    fn test_insert_replaces_and_remove() {
        let cache = MemoryCache::new();
        cache.insert("logger", 1_u8);
        cache.insert("logger", 2_u8);
        assert!(cache.contains("logger"));

        let removed = cache.remove("logger").unwrap();
        assert_eq!(*downcast::<u8>("logger", removed).unwrap(), 2);
        assert!(!cache.contains("logger"));
    }
}
