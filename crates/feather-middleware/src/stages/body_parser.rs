//! Request body parsing.
//!
//! [`BodyParser`] decodes JSON and urlencoded bodies into a [`ParsedBody`]
//! extension. [`BodyParserGate`] wraps any body-parsing stage and bypasses it
//! for requests covered by an [`IgnorePathMatcher`] rule, so handlers further
//! down the chain can consume the raw body themselves (uploads, proxies).

use crate::context::RequestContext;
use crate::ignore::IgnorePathMatcher;
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::types::{Request, Response};
use bytes::Bytes;
use feather_core::{BoxFuture, SharedLogger, StageError, StageResult};
use http::{header, StatusCode};
use http_body_util::{BodyExt, Full};
use std::sync::Arc;

/// Category used for pipeline diagnostics.
const SERVER_CATEGORY: &str = "http.server";

/// A decoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBody {
    /// `application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`, pairs in wire order.
    Form(Vec<(String, String)>),
}

impl ParsedBody {
    /// Returns the first form value for `name`.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match self {
            Self::Form(pairs) => pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
            Self::Json(_) => None,
        }
    }
}

/// Default body parser for JSON and urlencoded bodies.
///
/// Other content types pass through untouched. The request is rebuilt with
/// the same bytes, so the body stays readable downstream.
#[derive(Debug, Clone)]
pub struct BodyParser {
    limit_bytes: usize,
}

impl BodyParser {
    /// Creates a parser rejecting bodies over `limit_bytes` with 413.
    pub fn new(limit_bytes: usize) -> Self {
        Self { limit_bytes }
    }

    fn decode(content_type: &str, body: &[u8]) -> StageResult<Option<ParsedBody>> {
        let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

        match mime.as_str() {
            "application/json" => serde_json::from_slice(body)
                .map(|value| Some(ParsedBody::Json(value)))
                .map_err(|e| StageError::status(StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}"))),
            "application/x-www-form-urlencoded" => serde_urlencoded::from_bytes(body)
                .map(|pairs| Some(ParsedBody::Form(pairs)))
                .map_err(|e| StageError::status(StatusCode::BAD_REQUEST, format!("invalid form body: {e}"))),
            _ => Ok(None),
        }
    }

    fn too_large() -> StageError {
        StageError::status(StatusCode::PAYLOAD_TOO_LARGE, "request entity too large")
    }
}

impl Middleware for BodyParser {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            let declared = ctx
                .header(header::CONTENT_LENGTH)
                .and_then(|v| v.parse::<usize>().ok());
            if declared.is_some_and(|len| len > self.limit_bytes) {
                return Err(Self::too_large());
            }

            let (parts, body) = request.into_parts();
            let bytes: Bytes = body.collect().await.map_or_else(|never| match never {}, |c| c.to_bytes());
            if bytes.len() > self.limit_bytes {
                return Err(Self::too_large());
            }

            if !bytes.is_empty() {
                let content_type = parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if let Some(parsed) = Self::decode(content_type, &bytes)? {
                    ctx.set_extension(parsed);
                }
            }

            next.run(ctx, Request::from_parts(parts, Full::new(bytes))).await
        })
    }
}

/// Runs a body parser unless the request matches an ignore rule.
pub struct BodyParserGate {
    matcher: Arc<IgnorePathMatcher>,
    parser: BoxedMiddleware,
    logger: SharedLogger,
}

impl BodyParserGate {
    /// Wraps `parser` with the bypass rules in `matcher`.
    pub fn new(matcher: Arc<IgnorePathMatcher>, parser: BoxedMiddleware, logger: SharedLogger) -> Self {
        Self {
            matcher,
            parser,
            logger,
        }
    }
}

impl std::fmt::Debug for BodyParserGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyParserGate")
            .field("rules", &self.matcher.rules().len())
            .field("parser", &self.parser.name())
            .finish_non_exhaustive()
    }
}

impl Middleware for BodyParserGate {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            if self.matcher.find(ctx.path(), ctx.method().as_str()).is_some() {
                self.logger
                    .debug(SERVER_CATEGORY, &format!("Not running body parser for {}", ctx.url()));
                feather_telemetry::metrics::record_body_parser_skipped();
                return next.run(ctx, request).await;
            }
            self.parser.process(ctx, request, next).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use feather_core::fixtures::RecordingLogger;
    use feather_core::Level;
    use http::HeaderValue;
    use indexmap::IndexMap;

    fn post(url: &str, content_type: &'static str, body: &'static str) -> (RequestContext, Request) {
        let mut request = http::Request::post(url)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        request
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        (RequestContext::from_request(&request), request)
    }

    fn echo_body() -> Next<'static> {
        Next::handler(|_ctx, request| {
            Box::pin(async move {
                let body = request.into_body().collect().await.unwrap().to_bytes();
                Ok(Response::with_body(StatusCode::OK, "text/plain", body))
            })
        })
    }

    #[tokio::test]
    async fn test_json_body_is_parsed_and_preserved() {
        let (mut ctx, request) = post("/api", "application/json", r#"{"name":"feather"}"#);
        let response = BodyParser::new(1024)
            .process(&mut ctx, request, echo_body())
            .await
            .unwrap();

        let parsed = ctx.get_extension::<ParsedBody>().unwrap();
        assert_eq!(parsed, &ParsedBody::Json(serde_json::json!({"name": "feather"})));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, r#"{"name":"feather"}"#);
    }

    #[tokio::test]
    async fn test_form_body_is_parsed() {
        let (mut ctx, request) = post(
            "/login",
            "application/x-www-form-urlencoded; charset=utf-8",
            "user=ada&next=%2Fhome",
        );
        let _ = BodyParser::new(1024).process(&mut ctx, request, Next::end()).await;
        let parsed = ctx.get_extension::<ParsedBody>().unwrap();
        assert_eq!(parsed.form_value("next"), Some("/home"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (mut ctx, request) = post("/api", "application/json", "{nope");
        let err = BodyParser::new(1024)
            .process(&mut ctx, request, Next::end())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let (mut ctx, request) = post("/api", "text/plain", "0123456789");
        let err = BodyParser::new(4)
            .process(&mut ctx, request, Next::end())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_gate_bypasses_matching_requests() {
        let mut rules = IndexMap::new();
        rules.insert("^/upload".to_string(), "post".to_string());
        let logger = Arc::new(RecordingLogger::new(Level::Debug));
        let gate = BodyParserGate::new(
            Arc::new(IgnorePathMatcher::from_config(&rules).unwrap()),
            Arc::new(BodyParser::new(1024)),
            logger.clone(),
        );

        let (mut ctx, request) = post("/upload/file?x=1", "application/json", "{not json");
        let response = gate.process(&mut ctx, request, echo_body()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!ctx.has_extension::<ParsedBody>());
        assert_eq!(
            logger.messages("http.server"),
            vec!["Not running body parser for /upload/file?x=1".to_string()]
        );

        let (mut ctx, request) = post("/api", "application/json", "{not json");
        assert!(gate.process(&mut ctx, request, echo_body()).await.is_err());
    }
}
