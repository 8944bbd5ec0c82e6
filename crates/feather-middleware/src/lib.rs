//! # Feather Middleware
//!
//! Request pipeline assembly for the Feather web server.
//!
//! The pipeline is built once at startup from the configuration and from
//! dependencies resolved out of a shared cache (`files`, `logger`,
//! `router`). It is immutable afterwards and shared by all requests.
//!
//! ## Pipeline
//!
//! ```text
//! Request → [access_log] → [compression] → cookie_parser → session
//!         → body_parser → page_resolver → <extensions> → router
//!         → rewrite_redirect → rest_router → static_files → not_found
//!         → static_files_404 → resource_missing
//!
//! failure → error_reporter → error_responder
//! ```
//!
//! Unmatched requests are redirected once (303) to the configured 404 page.
//! If that page is also missing the request ends as a not-found failure,
//! logged with the URL the client originally asked for.
//!
//! ## Example
//!
//! ```
//! use feather_config::FeatherConfig;
//! use feather_core::cache::keys;
//! use feather_core::fixtures::RecordingLogger;
//! use feather_core::{Level, MemoryCache, SharedLogger};
//! use feather_middleware::files::FileIndex;
//! use feather_middleware::stages::RewriteRouter;
//! use feather_middleware::{Bootstrap, BoxedMiddleware};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let cache = Arc::new(MemoryCache::new());
//! cache.insert(keys::FILES, FileIndex::new());
//! let logger: SharedLogger = Arc::new(RecordingLogger::new(Level::Warn));
//! cache.insert(keys::LOGGER, logger);
//! let router: BoxedMiddleware = Arc::new(RewriteRouter::default());
//! cache.insert(keys::ROUTER, router);
//!
//! let built = Bootstrap::new(FeatherConfig::default(), cache).run().await.unwrap();
//! assert_eq!(built.pipeline.stage_names().last(), Some(&"resource_missing"));
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod context;
mod error;
pub mod extension;
pub mod files;
pub mod ignore;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use bootstrap::{Bootstrap, Dependencies};
pub use context::RequestContext;
pub use error::{BuildError, BuildResult};
pub use extension::{ExtensionError, ExtensionProvider, FnExtension};
pub use feather_core::BoxFuture;
pub use middleware::{BoxedErrorMiddleware, BoxedMiddleware, ErrorMiddleware, FnMiddleware, Middleware, Next};
pub use pipeline::{BuiltPipeline, Pipeline, PipelineBuilder};
pub use types::{Request, Response, ResponseExt};
