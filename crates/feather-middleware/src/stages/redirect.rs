//! Redirect and not-found stages.
//!
//! The 404 flow never loops: [`NotFoundRedirect`] only redirects when the
//! current path differs from the path part of the configured 404 URL, so a
//! query or fragment on either side is ignored. Once the client follows the
//! redirect, the second pass reaches the 404 page (or [`ResourceMissing`])
//! without redirecting again.

use crate::context::{path_of, RequestContext};
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use feather_core::{BoxFuture, SharedLogger, StageError, StageResult};

const SERVER_CATEGORY: &str = "http.server";

/// Answers a router rewrite with `303 See Other` to the rewritten URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteRedirect;

impl Middleware for RewriteRedirect {
    fn name(&self) -> &'static str {
        "rewrite_redirect"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            if ctx.is_rewritten() {
                tracing::debug!(from = %ctx.original_url(), to = %ctx.url(), "redirecting rewritten url");
                return Response::see_other(ctx.url());
            }
            next.run(ctx, request).await
        })
    }
}

/// Redirects unserved requests to the configured 404 page.
pub struct NotFoundRedirect {
    not_found_path: String,
    logger: SharedLogger,
}

impl NotFoundRedirect {
    /// Creates the stage for the 404 page at `not_found_path`.
    pub fn new(not_found_path: impl Into<String>, logger: SharedLogger) -> Self {
        Self {
            not_found_path: not_found_path.into(),
            logger,
        }
    }
}

impl std::fmt::Debug for NotFoundRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotFoundRedirect")
            .field("not_found_path", &self.not_found_path)
            .finish_non_exhaustive()
    }
}

impl Middleware for NotFoundRedirect {
    fn name(&self) -> &'static str {
        "not_found"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            self.logger
                .info(SERVER_CATEGORY, &format!("404 error for url {}", ctx.url()));
            feather_telemetry::metrics::record_not_found();

            if ctx.path() != path_of(&self.not_found_path) {
                ctx.set_url(self.not_found_path.clone());
                return Response::see_other(&self.not_found_path);
            }
            next.run(ctx, request).await
        })
    }
}

/// Terminal stage: nothing served the request, not even the 404 page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceMissing;

impl Middleware for ResourceMissing {
    fn name(&self) -> &'static str {
        "resource_missing"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _request: Request,
        _next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move { Err(StageError::not_found(ctx.url())) })
    }
}
