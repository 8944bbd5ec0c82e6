//! Access logging.
//!
//! The stage registers a completion hook and passes the request on
//! untouched. The hook runs once the final response is known (including
//! responses rendered by error stages) and emits one line per request at
//! `info` under `http.access`:
//!
//! ```text
//! <remote> - <worker>:<session> - <date> "<METHOD> <original-url> HTTP/<v>" <status> <content-length> "<referrer>" "<user-agent>"
//! ```
//!
//! With `trace` enabled for `http.access.headers`, request and response
//! headers are logged as JSON as well.

use super::session::Session;
use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use chrono::{DateTime, Utc};
use feather_core::{BoxFuture, Level, SharedLogger, StageResult};
use http::{header, HeaderMap, Version};
use serde_json::{Map, Value};

/// Category of access-log lines.
pub const ACCESS_CATEGORY: &str = "http.access";

/// Category of the header dumps.
pub const HEADERS_CATEGORY: &str = "http.access.headers";

/// Marks a request whose completion hook is already registered.
struct AccessLogged;

/// Access-log stage.
pub struct AccessLogMiddleware {
    logger: SharedLogger,
    worker_id: u32,
}

impl AccessLogMiddleware {
    /// Creates the stage. `worker_id` identifies this process in
    /// multi-process deployments; single-process servers pass `0`.
    pub fn new(logger: SharedLogger, worker_id: u32) -> Self {
        Self { logger, worker_id }
    }
}

impl std::fmt::Debug for AccessLogMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogMiddleware")
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}

/// Formats one access-log line.
pub fn format_line(ctx: &RequestContext, response: &Response, worker_id: u32, now: DateTime<Utc>) -> String {
    let remote = ctx
        .header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| ctx.remote_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_default();
    let session = ctx.get_extension::<Session>().map_or("", Session::id);
    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let referrer = ctx
        .header(header::REFERER)
        .or_else(|| ctx.header("referrer"))
        .unwrap_or("");
    let user_agent = ctx.header(header::USER_AGENT).unwrap_or("");

    format!(
        "{remote} - {worker_id}:{session} - {date} \"{method} {url} HTTP/{version}\" {status} {content_length} \"{referrer}\" \"{user_agent}\"",
        date = now.format("%a, %d %b %Y %H:%M:%S GMT"),
        method = ctx.method(),
        url = ctx.original_url(),
        version = http_version(ctx.version()),
        status = response.status().as_u16(),
    )
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

/// Request headers as a JSON object; repeated headers are joined with `, `.
fn request_headers_json(headers: &HeaderMap) -> String {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(map).to_string()
}

/// Response head as a JSON array: the status line, then `name: value` lines.
fn response_headers_json(response: &Response) -> String {
    let status = response.status();
    let mut lines = vec![Value::String(format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    ))];
    lines.extend(response.headers().iter().map(|(name, value)| {
        Value::String(format!("{name}: {}", String::from_utf8_lossy(value.as_bytes())))
    }));
    Value::Array(lines).to_string()
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            if !ctx.has_extension::<AccessLogged>() {
                ctx.set_extension(AccessLogged);

                let logger = self.logger.clone();
                let worker_id = self.worker_id;
                ctx.on_complete(move |ctx, response| {
                    let line = format_line(ctx, response, worker_id, Utc::now());
                    logger.info(ACCESS_CATEGORY, &line);

                    if logger.is_enabled(Level::Trace, HEADERS_CATEGORY) {
                        logger.trace(
                            HEADERS_CATEGORY,
                            &format!("REQ HDR: {}", request_headers_json(ctx.headers())),
                        );
                        logger.trace(
                            HEADERS_CATEGORY,
                            &format!("RES HDR: {}", response_headers_json(response)),
                        );
                    }

                    feather_telemetry::metrics::record_request(
                        ctx.method().as_str(),
                        response.status().as_u16(),
                        ctx.elapsed(),
                    );
                });
            }
            next.run(ctx, request).await
        })
    }
}
