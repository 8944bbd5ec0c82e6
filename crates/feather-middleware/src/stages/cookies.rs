//! Cookie parsing stage.
//!
//! Parses the `Cookie` header into a [`Cookies`] extension. When a cookie
//! secret is configured, values carrying the signed-cookie prefix `s:` are
//! stored without it.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use feather_core::{BoxFuture, StageResult};
use http::header;
use std::collections::HashMap;

/// Prefix marking a signed cookie value.
pub const SIGNED_PREFIX: &str = "s:";

/// Cookies sent with the request.
///
/// ```
/// use feather_middleware::stages::Cookies;
///
/// let cookies = Cookies::parse("session=abc123; theme=\"dark\"", false);
/// assert_eq!(cookies.get("session"), Some("abc123"));
/// assert_eq!(cookies.get("theme"), Some("dark"));
/// assert_eq!(cookies.get("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    cookies: HashMap<String, String>,
}

impl Cookies {
    /// Parses a `Cookie` header value.
    ///
    /// Pairs without `=` are skipped. When `strip_signed` is set, a leading
    /// `s:` is removed from values.
    pub fn parse(header_value: &str, strip_signed: bool) -> Self {
        let cookies = header_value
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| {
                let value = value.trim().trim_matches('"');
                let value = if strip_signed {
                    value.strip_prefix(SIGNED_PREFIX).unwrap_or(value)
                } else {
                    value
                };
                (name.trim().to_string(), value.to_string())
            })
            .collect();
        Self { cookies }
    }

    /// Returns a cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns true if the cookie was sent.
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if no cookies were sent.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Stage storing a [`Cookies`] extension on every request.
#[derive(Debug, Clone, Default)]
pub struct CookieParser {
    secret: Option<String>,
}

impl CookieParser {
    /// Creates a parser. A secret enables stripping of the signed prefix.
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }
}

impl Middleware for CookieParser {
    fn name(&self) -> &'static str {
        "cookie_parser"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            let cookies = ctx
                .header(header::COOKIE)
                .map(|value| Cookies::parse(value, self.secret.is_some()))
                .unwrap_or_default();
            ctx.set_extension(cookies);
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderValue, Method};
    use http_body_util::Full;

    #[test]
    fn test_pairs_without_value_are_skipped() {
        let cookies = Cookies::parse("flag; a=1;;b = 2 ", false);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("b"), Some("2"));
        assert!(!cookies.contains("flag"));
    }

    #[test]
    fn test_signed_prefix_only_stripped_with_secret() {
        assert_eq!(Cookies::parse("sid=s:abc.sig", true).get("sid"), Some("abc.sig"));
        assert_eq!(Cookies::parse("sid=s:abc.sig", false).get("sid"), Some("s:abc.sig"));
    }

    #[tokio::test]
    async fn test_stage_sets_extension() {
        let mut request = http::Request::new(Full::new(Bytes::new()));
        request
            .headers_mut()
            .insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        let mut ctx = RequestContext::from_request(&request);

        let _ = CookieParser::new(None)
            .process(&mut ctx, request, Next::end())
            .await;
        assert_eq!(ctx.get_extension::<Cookies>().unwrap().get("theme"), Some("dark"));
    }

    #[tokio::test]
    async fn test_missing_header_gives_empty_cookies() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        let _ = CookieParser::default()
            .process(&mut ctx, http::Request::new(Full::new(Bytes::new())), Next::end())
            .await;
        assert!(ctx.get_extension::<Cookies>().unwrap().is_empty());
    }
}
