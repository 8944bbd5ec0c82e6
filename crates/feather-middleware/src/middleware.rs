//! Core stage traits and the [`Next`] continuation.
//!
//! A pipeline is a list of [`Middleware`] stages followed by a list of
//! [`ErrorMiddleware`] stages. A normal stage either produces a response
//! (ending the chain), fails with a [`StageError`], or hands the request to
//! the rest of the chain through [`Next::run`]. Failures skip the remaining
//! normal stages and are offered to the error stages in order.
//!
//! # Example
//!
//! ```ignore
//! use feather_middleware::{BoxFuture, Middleware, Next, Request, Response, RequestContext};
//! use feather_core::StageResult;
//!
//! struct Tag;
//!
//! impl Middleware for Tag {
//!     fn name(&self) -> &'static str {
//!         "tag"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, StageResult<Response>> {
//!         Box::pin(async move {
//!             ctx.set_extension("tagged");
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use crate::context::RequestContext;
use crate::types::{Request, Response};
use feather_core::{BoxFuture, StageError, StageResult};
use std::sync::Arc;

/// A normal pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once
/// - A stage that returns without calling `next` ends the chain
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs and introspection.
    fn name(&self) -> &'static str;

    /// Processes the request.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>>;
}

/// An error-handling stage.
///
/// Error stages run in order after a normal stage fails. The first one to
/// return `Ok` produces the response; returning `Err` passes the (possibly
/// replaced) error on to the next error stage.
pub trait ErrorMiddleware: Send + Sync + 'static {
    /// Returns the name of this stage.
    fn name(&self) -> &'static str;

    /// Handles a failure raised by a normal stage.
    fn handle<'a>(
        &'a self,
        error: StageError,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, StageResult<Response>>;
}

/// A type-erased stage that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A type-erased error stage.
pub type BoxedErrorMiddleware = Arc<dyn ErrorMiddleware>;

/// Continuation to the remainder of the chain.
///
/// Consumed by [`run`](Next::run), so it can be invoked at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(
        Box<dyn FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, StageResult<Response>> + Send + 'a>,
    ),
    End,
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given stage.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes a handler function.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestContext, Request) -> BoxFuture<'static, StageResult<Response>> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Creates the terminal `Next` of a pipeline.
    ///
    /// Running it means no stage produced a response; it fails with
    /// [`StageError::ResourceNotFound`] for the current URL.
    pub fn end() -> Self {
        Self {
            inner: NextInner::End,
        }
    }

    /// Invokes the next stage or the terminal handler.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> StageResult<Response> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
            NextInner::End => Err(StageError::not_found(ctx.url())),
        }
    }
}

/// A stage built from a closure.
///
/// # Example
///
/// ```
/// use feather_middleware::{FnMiddleware, Middleware};
///
/// let stage = FnMiddleware::new("mark", |ctx, request, next| {
///     Box::pin(async move {
///         ctx.set_extension(true);
///         next.run(ctx, request).await
///     })
/// });
/// assert_eq!(stage.name(), "mark");
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, StageResult<Response>>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new closure-based stage.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Request, Next<'a>) -> BoxFuture<'a, StageResult<Response>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        (self.func)(ctx, request, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;

    struct TestMiddleware {
        name: &'static str,
    }

    impl Middleware for TestMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, StageResult<Response>> {
            Box::pin(async move {
                let mut visited = ctx.remove_extension::<Vec<&'static str>>().unwrap_or_default();
                visited.push(self.name);
                ctx.set_extension(visited);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = RequestContext::new(Method::GET, "/test");
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::text(StatusCode::OK, "OK")) })
        });

        let response = next.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_end_fails_with_not_found() {
        let mut ctx = RequestContext::new(Method::GET, "/missing.png");
        let err = Next::end().run(&mut ctx, request()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().ends_with(": /missing.png"));
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let mw1 = TestMiddleware { name: "first" };
        let mw2 = TestMiddleware { name: "second" };

        let mut ctx = RequestContext::new(Method::GET, "/test");
        let handler = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::text(StatusCode::OK, "OK")) })
        });
        let next = Next::new(&mw1, Next::new(&mw2, handler));

        let response = next.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<Vec<&'static str>>().unwrap(),
            &vec!["first", "second"]
        );
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuits() {
        let stage = FnMiddleware::new("teapot", |_ctx, _request, _next| {
            Box::pin(async { Ok(Response::text(StatusCode::IM_A_TEAPOT, "short and stout")) })
        });

        let mut ctx = RequestContext::new(Method::GET, "/test");
        let response = Next::new(&stage, Next::end())
            .run(&mut ctx, request())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
