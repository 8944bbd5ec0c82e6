//! # Feather Core
//!
//! Core types shared by every Feather crate:
//!
//! - [`StageError`] - Failures surfaced by pipeline stages while a request is in flight
//! - [`SharedCache`] / [`MemoryCache`] - Named, asynchronously resolved dependencies
//! - [`Logger`] - Category-aware logging contract used by the pipeline
//! - [`fixtures`] - Test doubles for loggers and caches

#![doc(html_root_url = "https://docs.rs/feather-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
mod error;
pub mod fixtures;
pub mod logger;

use std::future::Future;
use std::pin::Pin;

pub use cache::{CacheError, CacheValue, MemoryCache, SharedCache};
pub use error::{StageError, StageResult, NOT_FOUND_MESSAGE};
pub use logger::{CategoryLevels, Level, Logger, SharedLogger};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
