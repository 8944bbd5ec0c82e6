//! Pipeline construction errors.

use crate::extension::ExtensionError;
use feather_config::ConfigError;
use feather_core::CacheError;
use thiserror::Error;

/// Failure while building a pipeline. No pipeline is produced and the
/// build is not retried.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid configuration, such as a pattern that does not compile.
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),

    /// A dependency could not be resolved from the shared cache.
    #[error("failed to resolve {key:?} from the cache: {source}")]
    Bootstrap {
        /// The cache key.
        key: String,
        /// The underlying cache error.
        #[source]
        source: CacheError,
    },

    /// The extension provider failed.
    #[error(transparent)]
    Extension(#[from] ExtensionError),
}

impl From<CacheError> for BuildError {
    fn from(source: CacheError) -> Self {
        Self::Bootstrap {
            key: source.key().to_string(),
            source,
        }
    }
}

/// Result type for pipeline construction.
pub type BuildResult<T> = Result<T, BuildError>;
