//! Default router: ordered URL rewrites.
//!
//! The first rule whose regex matches the current URL rewrites it with the
//! rule's replacement (`$1`-style captures allowed); the request then
//! continues. The rewrite is answered with a 303 by the stage that follows
//! the router, so the client re-requests the canonical URL.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use feather_config::ConfigError;
use feather_core::{BoxFuture, StageResult};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

/// Regex-driven rewrite router.
#[derive(Debug, Clone, Default)]
pub struct RewriteRouter {
    rules: Vec<(Regex, String)>,
}

impl RewriteRouter {
    /// Compiles the rules in declaration order.
    pub fn new(routes: &IndexMap<String, String>) -> Result<Self, ConfigError> {
        let rules = routes
            .iter()
            .map(|(pattern, replacement)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (regex, replacement.clone()))
                    .map_err(|e| ConfigError::invalid_value("routes", format!("{pattern}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Returns the rewritten URL, or `None` if no rule applies.
    pub fn rewrite(&self, url: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(url))
            .map(|(regex, replacement)| regex.replace(url, replacement.as_str()).into_owned())
    }
}

impl Middleware for RewriteRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            if let Some(url) = self.rewrite(ctx.url()) {
                tracing::debug!(from = %ctx.url(), to = %url, "router rewrote url");
                ctx.set_url(url);
            }
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use http_body_util::Full;

    fn router(rules: &[(&str, &str)]) -> RewriteRouter {
        let map: IndexMap<String, String> = rules
            .iter()
            .map(|(p, r)| ((*p).to_string(), (*r).to_string()))
            .collect();
        RewriteRouter::new(&map).unwrap()
    }

    #[test]
    fn test_rewrite_with_captures() {
        let r = router(&[("^/old/(.*)$", "/new/$1")]);
        assert_eq!(r.rewrite("/old/page").as_deref(), Some("/new/page"));
        assert_eq!(r.rewrite("/other"), None);
    }

    #[test]
    fn test_invalid_rule_is_config_error() {
        let mut map = IndexMap::new();
        map.insert("[".to_string(), "/x".to_string());
        assert!(RewriteRouter::new(&map).is_err());
    }

    #[tokio::test]
    async fn test_rewrites_current_url_only() {
        let r = router(&[("^/home$", "/index.html")]);
        let mut ctx = RequestContext::new(Method::GET, "/home");
        let _ = r
            .process(&mut ctx, http::Request::new(Full::new(Bytes::new())), Next::end())
            .await;
        assert_eq!(ctx.url(), "/index.html");
        assert_eq!(ctx.original_url(), "/home");
    }
}
