//! Asynchronous pipeline construction.
//!
//! [`Bootstrap`] resolves the pipeline's dependencies from a
//! [`SharedCache`] and hands them to the [`PipelineBuilder`]:
//!
//! 1. validate the configuration (patterns are compiled here)
//! 2. resolve `files` and `logger` together
//! 3. resolve `router`, only once step 2 succeeded
//! 4. ask the extension provider, if any, for extra stages
//! 5. build the pipeline
//!
//! Any failure ends the sequence with a [`BuildError`]; nothing is retried.
//!
//! # Example
//!
//! ```
//! use feather_config::FeatherConfig;
//! use feather_core::cache::keys;
//! use feather_core::fixtures::RecordingLogger;
//! use feather_core::{Level, MemoryCache, SharedLogger};
//! use feather_middleware::bootstrap::Bootstrap;
//! use feather_middleware::files::FileIndex;
//! use feather_middleware::stages::RewriteRouter;
//! use feather_middleware::BoxedMiddleware;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let cache = Arc::new(MemoryCache::new());
//! cache.insert(keys::FILES, FileIndex::new());
//! let logger: SharedLogger = Arc::new(RecordingLogger::new(Level::Info));
//! cache.insert(keys::LOGGER, logger);
//! let router: BoxedMiddleware = Arc::new(RewriteRouter::default());
//! cache.insert(keys::ROUTER, router);
//!
//! let built = Bootstrap::new(FeatherConfig::default(), cache).run().await.unwrap();
//! assert_eq!(built.pipeline.stage_names()[0], "access_log");
//! # });
//! ```

use crate::error::{BuildError, BuildResult};
use crate::extension::ExtensionProvider;
use crate::files::FileIndex;
use crate::middleware::BoxedMiddleware;
use crate::pipeline::{BuiltPipeline, PipelineBuilder};
use feather_config::FeatherConfig;
use feather_core::cache::{self, keys};
use feather_core::{CacheError, SharedCache, SharedLogger};
use std::sync::Arc;

/// Dependencies resolved from the cache, shared with extension providers.
#[derive(Clone)]
pub struct Dependencies {
    /// Known templated pages and REST resources.
    pub files: Arc<FileIndex>,
    /// The logger.
    pub logger: SharedLogger,
    /// The router stage.
    pub router: BoxedMiddleware,
}

impl Dependencies {
    /// Bundles already-resolved dependencies.
    pub fn new(files: Arc<FileIndex>, logger: SharedLogger, router: BoxedMiddleware) -> Self {
        Self { files, logger, router }
    }

    /// Resolves the bundle from `cache`: `files` and `logger` together,
    /// then `router`.
    pub async fn resolve(cache: &dyn SharedCache) -> BuildResult<Self> {
        let mut items = cache.get_many(&[keys::FILES, keys::LOGGER]).await?;
        let mut take = |key: &str| {
            items
                .remove(key)
                .ok_or_else(|| CacheError::Missing(key.to_string()))
        };
        let files = cache::downcast::<FileIndex>(keys::FILES, take(keys::FILES)?)?;
        let logger = cache::downcast::<SharedLogger>(keys::LOGGER, take(keys::LOGGER)?)?;
        tracing::debug!(pages = files.page_files().len(), "resolved files and logger");

        let router = cache::get_as::<BoxedMiddleware>(cache, keys::ROUTER).await?;
        tracing::debug!(router = router.name(), "resolved router");

        Ok(Self {
            files,
            logger: SharedLogger::clone(&logger),
            router: BoxedMiddleware::clone(&router),
        })
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("files", &self.files)
            .field("router", &self.router.name())
            .finish_non_exhaustive()
    }
}

type Customize = Box<dyn FnOnce(PipelineBuilder) -> PipelineBuilder + Send>;

/// One-shot pipeline construction from a shared cache.
pub struct Bootstrap {
    config: Arc<FeatherConfig>,
    cache: Arc<dyn SharedCache>,
    extension: Option<Box<dyn ExtensionProvider>>,
    customize: Option<Customize>,
}

impl Bootstrap {
    /// Prepares construction for `config`, resolving dependencies from `cache`.
    pub fn new(config: impl Into<Arc<FeatherConfig>>, cache: Arc<dyn SharedCache>) -> Self {
        Self {
            config: config.into(),
            cache,
            extension: None,
            customize: None,
        }
    }

    /// Sets the provider of stages to splice in before the router.
    pub fn extension(mut self, provider: impl ExtensionProvider) -> Self {
        self.extension = Some(Box::new(provider));
        self
    }

    /// Adjusts the builder (e.g. to replace a collaborator) before building.
    pub fn configure<F>(mut self, customize: F) -> Self
    where
        F: FnOnce(PipelineBuilder) -> PipelineBuilder + Send + 'static,
    {
        self.customize = Some(Box::new(customize));
        self
    }

    /// Runs the construction sequence.
    pub async fn run(self) -> Result<BuiltPipeline, BuildError> {
        self.config.validate()?;

        let deps = Dependencies::resolve(self.cache.as_ref()).await?;

        let extra = match &self.extension {
            Some(provider) => {
                let stages = provider.stages(&deps).await?;
                tracing::debug!(count = stages.len(), "extension stages provided");
                stages
            }
            None => Vec::new(),
        };

        let mut builder = PipelineBuilder::new(self.config, deps, self.cache).before_router(extra);
        if let Some(customize) = self.customize {
            builder = customize(builder);
        }
        builder.build()
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("has_extension", &self.extension.is_some())
            .finish_non_exhaustive()
    }
}
