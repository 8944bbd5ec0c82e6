//! Error stages.
//!
//! [`ErrorReporter`] logs every failure and re-raises it; [`ErrorResponder`]
//! turns it into a response. Failures are classified by [`StageError`]
//! variant: a missing resource is logged under `404`, everything else under
//! `uncaught`.

use crate::context::RequestContext;
use crate::middleware::ErrorMiddleware;
use crate::types::{Response, ResponseExt};
use feather_core::cache::{self, keys};
use feather_core::{BoxFuture, SharedCache, SharedLogger, StageError, StageResult};
use http::{header, StatusCode};
use std::sync::Arc;

/// Category for requests that ran out of stages.
pub const NOT_FOUND_CATEGORY: &str = "404";

/// Category for every other failure.
pub const UNCAUGHT_CATEGORY: &str = "uncaught";

/// Logs failures and re-raises them.
///
/// The logger is resolved from the cache for each failure so a rotated
/// logger is picked up. If it cannot be resolved the failure passes through
/// unlogged.
pub struct ErrorReporter {
    cache: Arc<dyn SharedCache>,
}

impl ErrorReporter {
    /// Creates a reporter resolving its logger from `cache`.
    pub fn new(cache: Arc<dyn SharedCache>) -> Self {
        Self { cache }
    }

    fn report(logger: &SharedLogger, error: &StageError, ctx: &RequestContext) {
        if error.is_not_found() {
            logger.error(
                NOT_FOUND_CATEGORY,
                &format!("Request for non-existent resource: {}", ctx.original_url()),
            );
        } else {
            logger.error(
                UNCAUGHT_CATEGORY,
                &format!("Uncaught failure in request pipeline: {}", error.detail()),
            );
            feather_telemetry::metrics::record_uncaught();
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}

impl ErrorMiddleware for ErrorReporter {
    fn name(&self) -> &'static str {
        "error_reporter"
    }

    fn handle<'a>(
        &'a self,
        error: StageError,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            match cache::get_as::<SharedLogger>(self.cache.as_ref(), keys::LOGGER).await {
                Ok(logger) => Self::report(&logger, &error, ctx),
                Err(e) => {
                    tracing::warn!(error = %e, request_id = %ctx.request_id(), "logger unavailable, failure not reported");
                }
            }
            Err(error)
        })
    }
}

/// Renders failures as JSON, HTML, or plain text depending on `Accept`.
///
/// Error details (the message of server errors and the cause chain) are
/// only shown in debug mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorResponder {
    debug: bool,
}

impl ErrorResponder {
    /// Creates the responder.
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn message(&self, error: &StageError) -> String {
        let status = error.status_code();
        if status.is_server_error() && !self.debug {
            status.canonical_reason().unwrap_or("Internal Server Error").to_string()
        } else {
            error.to_string()
        }
    }

    fn render(&self, error: &StageError, ctx: &RequestContext) -> Response {
        let status = error.status_code();
        let message = self.message(error);
        let detail = self.debug.then(|| error.detail());
        let accept = ctx.header(header::ACCEPT).unwrap_or("");

        if accept.contains("application/json") {
            let mut body = serde_json::json!({
                "error": {
                    "status": status.as_u16(),
                    "message": message,
                    "request_id": ctx.request_id().to_string(),
                }
            });
            if let Some(detail) = detail {
                body["error"]["detail"] = serde_json::Value::String(detail);
            }
            Response::json(status, &body)
        } else if accept.contains("text/html") {
            let title = format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""));
            let mut html = format!(
                "<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{title}</h1><p>{}</p>",
                escape_html(&message)
            );
            if let Some(detail) = detail {
                html.push_str(&format!("<pre>{}</pre>", escape_html(&detail)));
            }
            html.push_str("</body></html>");
            Response::with_body(status, "text/html; charset=utf-8", html)
        } else {
            let text = match detail {
                Some(detail) => detail,
                None => message,
            };
            Response::text(status, &text)
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl ErrorMiddleware for ErrorResponder {
    fn name(&self) -> &'static str {
        "error_responder"
    }

    fn handle<'a>(
        &'a self,
        error: StageError,
        ctx: &'a mut RequestContext,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move { Ok(self.render(&error, ctx)) })
    }
}

/// Response used when every error stage re-raised.
pub(crate) fn fallback_response() -> Response {
    Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use feather_core::fixtures::RecordingLogger;
    use feather_core::{Level, MemoryCache};
    use http::{HeaderValue, Method};
    use http_body_util::BodyExt;

    fn cache_with(logger: &Arc<RecordingLogger>) -> Arc<MemoryCache> {
        let cache = Arc::new(MemoryCache::new());
        let shared: SharedLogger = logger.clone();
        cache.insert(keys::LOGGER, shared);
        cache
    }

    fn ctx_accepting(url: &str, accept: &'static str) -> RequestContext {
        let mut request = http::Request::get(url)
            .body(http_body_util::Full::new(bytes::Bytes::new()))
            .unwrap();
        request
            .headers_mut()
            .insert(header::ACCEPT, HeaderValue::from_static(accept));
        RequestContext::from_request(&request)
    }

    async fn body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_logged_with_original_url() {
        let logger = Arc::new(RecordingLogger::new(Level::Info));
        let reporter = ErrorReporter::new(cache_with(&logger));
        let mut ctx = RequestContext::new(Method::GET, "/missing.png");
        ctx.set_url("/404.html");

        let err = reporter
            .handle(StageError::not_found("/404.html"), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            logger.messages(NOT_FOUND_CATEGORY),
            vec!["Request for non-existent resource: /missing.png".to_string()]
        );
        assert!(logger.messages(UNCAUGHT_CATEGORY).is_empty());
    }

    #[tokio::test]
    async fn test_other_failures_logged_as_uncaught() {
        let logger = Arc::new(RecordingLogger::new(Level::Info));
        let reporter = ErrorReporter::new(cache_with(&logger));
        let mut ctx = RequestContext::new(Method::GET, "/");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let _ = reporter
            .handle(StageError::uncaught_with("static handler failed", io), &mut ctx)
            .await;

        let logged = logger.messages(UNCAUGHT_CATEGORY);
        assert_eq!(logged.len(), 1);
        assert!(logged[0].starts_with("Uncaught failure in request pipeline: static handler failed"));
        assert!(logged[0].contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_missing_logger_passes_error_through() {
        let reporter = ErrorReporter::new(Arc::new(MemoryCache::new()));
        let mut ctx = RequestContext::new(Method::GET, "/");
        let err = reporter
            .handle(StageError::uncaught("boom"), &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_responder_negotiates_json() {
        let mut ctx = ctx_accepting("/missing", "application/json");
        let response = ErrorResponder::new(false)
            .handle(StageError::not_found("/missing"), &mut ctx)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let value: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(value["error"]["status"], 404);
        assert!(value["error"].get("detail").is_none());
    }

    #[tokio::test]
    async fn test_responder_hides_server_error_detail_unless_debug() {
        let mut ctx = ctx_accepting("/", "text/html");
        let response = ErrorResponder::new(false)
            .handle(StageError::uncaught("secret <stack>"), &mut ctx)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body(response).await;
        assert!(html.contains("<h1>500 Internal Server Error</h1>"));
        assert!(!html.contains("secret"));

        let response = ErrorResponder::new(true)
            .handle(StageError::uncaught("secret <stack>"), &mut ctx)
            .await
            .unwrap();
        assert!(body(response).await.contains("secret &lt;stack&gt;"));
    }

    #[tokio::test]
    async fn test_responder_keeps_collaborator_status() {
        let mut ctx = RequestContext::new(Method::POST, "/api");
        let response = ErrorResponder::default()
            .handle(
                StageError::status(StatusCode::PAYLOAD_TOO_LARGE, "request entity too large"),
                &mut ctx,
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body(response).await, "request entity too large");
    }
}
