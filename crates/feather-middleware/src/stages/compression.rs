//! Gzip response compression.
//!
//! Installed at the front of the pipeline when `resources.publish.gzip` is
//! set. Compresses compressible bodies for clients that accept gzip; bodies
//! that are already encoded (such as precompressed static files) are left
//! alone.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use bytes::Bytes;
use feather_core::{BoxFuture, StageResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use http::{header, HeaderValue};
use http_body_util::{BodyExt, Full};
use std::io::Write;

/// Content types worth compressing.
const COMPRESSIBLE_TYPES: &[&str] = &[
    "text/plain",
    "text/html",
    "text/css",
    "text/javascript",
    "text/xml",
    "text/csv",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/xhtml+xml",
    "application/rss+xml",
    "application/ld+json",
    "application/manifest+json",
    "image/svg+xml",
    "image/x-icon",
];

/// Gzip compression stage.
#[derive(Debug, Clone)]
pub struct CompressionMiddleware {
    min_size: usize,
    level: Compression,
}

impl Default for CompressionMiddleware {
    fn default() -> Self {
        Self {
            min_size: 1024,
            level: Compression::default(),
        }
    }
}

impl CompressionMiddleware {
    /// Creates the stage with a 1 KiB threshold and the default level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum body size worth compressing.
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Sets the gzip level (0-9).
    pub fn level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }

    /// Returns true if an `Accept-Encoding` value admits gzip.
    fn accepts_gzip(accept_encoding: &str) -> bool {
        accept_encoding.split(',').any(|part| {
            let mut params = part.trim().split(';');
            let coding = params.next().unwrap_or("").trim();
            let quality = params
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (coding.eq_ignore_ascii_case("gzip") || coding == "*") && quality > 0.0
        })
    }

    fn is_compressible(content_type: &str) -> bool {
        let base = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        COMPRESSIBLE_TYPES.contains(&base.as_str())
    }

    fn gzip(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }
}

impl Middleware for CompressionMiddleware {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            let wants_gzip = ctx
                .header(header::ACCEPT_ENCODING)
                .is_some_and(Self::accepts_gzip);

            let mut response = next.run(ctx, request).await?;

            let compressible = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(Self::is_compressible);
            let encoded = response.headers().contains_key(header::CONTENT_ENCODING);
            if !compressible || encoded {
                return Ok(response);
            }

            // Identity and gzip clients may now see different bodies.
            response
                .headers_mut()
                .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
            if !wants_gzip {
                return Ok(response);
            }

            let (mut parts, body) = response.into_parts();
            let bytes: Bytes = body.collect().await.map_or_else(|never| match never {}, |c| c.to_bytes());
            if bytes.len() < self.min_size {
                return Ok(Response::from_parts(parts, Full::new(bytes)));
            }

            let compressed = match self.gzip(&bytes) {
                Ok(data) if data.len() < bytes.len() => data,
                Ok(_) => return Ok(Response::from_parts(parts, Full::new(bytes))),
                Err(e) => {
                    tracing::warn!(error = %e, "gzip failed, sending uncompressed body");
                    return Ok(Response::from_parts(parts, Full::new(bytes)));
                }
            };

            parts
                .headers
                .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(compressed.len()));
            Ok(Response::from_parts(parts, Full::new(Bytes::from(compressed))))
        })
    }
}
