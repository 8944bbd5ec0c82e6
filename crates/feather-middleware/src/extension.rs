//! Caller-supplied stages.
//!
//! An [`ExtensionProvider`] is asked once, while the pipeline is being
//! built, for the stages it wants to run. They are spliced in immediately
//! before the router, after request parsing and page classification.

use crate::bootstrap::Dependencies;
use crate::middleware::BoxedMiddleware;
use feather_core::BoxFuture;
use thiserror::Error;

/// Failure reported by an extension provider. Aborts the build.
#[derive(Debug, Error)]
#[error("extension provider failed: {message}")]
pub struct ExtensionError {
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl ExtensionError {
    /// Creates an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Supplies extra stages from the resolved dependencies.
pub trait ExtensionProvider: Send + Sync + 'static {
    /// Returns the stages to run before the router, in order.
    fn stages<'a>(
        &'a self,
        deps: &'a Dependencies,
    ) -> BoxFuture<'a, Result<Vec<BoxedMiddleware>, ExtensionError>>;
}

/// An extension provider built from a closure.
///
/// # Example
///
/// ```
/// use feather_middleware::extension::FnExtension;
/// use feather_middleware::{BoxedMiddleware, FnMiddleware};
/// use std::sync::Arc;
///
/// let provider = FnExtension::new(|_deps| {
///     Box::pin(async {
///         let stage: BoxedMiddleware = Arc::new(FnMiddleware::new("noop", |ctx, request, next| {
///             Box::pin(async move { next.run(ctx, request).await })
///         }));
///         Ok(vec![stage])
///     })
/// });
/// # let _ = provider;
/// ```
pub struct FnExtension<F> {
    func: F,
}

impl<F> FnExtension<F>
where
    F: for<'a> Fn(&'a Dependencies) -> BoxFuture<'a, Result<Vec<BoxedMiddleware>, ExtensionError>>
        + Send
        + Sync
        + 'static,
{
    /// Wraps a closure.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> ExtensionProvider for FnExtension<F>
where
    F: for<'a> Fn(&'a Dependencies) -> BoxFuture<'a, Result<Vec<BoxedMiddleware>, ExtensionError>>
        + Send
        + Sync
        + 'static,
{
    fn stages<'a>(
        &'a self,
        deps: &'a Dependencies,
    ) -> BoxFuture<'a, Result<Vec<BoxedMiddleware>, ExtensionError>> {
        (self.func)(deps)
    }
}
