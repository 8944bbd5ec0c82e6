//! Templated-page classification.
//!
//! Never rejects a request: unmatched requests continue unflagged and are
//! left to the router and static handler.

use crate::context::{path_of, RequestContext};
use crate::files::FileIndex;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use feather_config::{ConfigError, FeatherConfig};
use feather_core::{BoxFuture, StageResult};
use regex::{Regex, RegexBuilder};
use std::path::PathBuf;
use std::sync::Arc;

/// Classifies requests as templated pages.
#[derive(Debug, Clone)]
pub struct PageResolver {
    public_root: PathBuf,
    suffix: String,
    files: Arc<FileIndex>,
    routes: Vec<(Regex, String)>,
}

impl PageResolver {
    /// Builds a resolver, compiling `pageRoutes` once in declaration order.
    pub fn new(config: &FeatherConfig, files: Arc<FileIndex>) -> Result<Self, ConfigError> {
        let routes = config
            .page_routes
            .iter()
            .map(|(pattern, page)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (regex, page.clone()))
                    .map_err(|e| ConfigError::invalid_value("pageRoutes", format!("{pattern}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            public_root: config.public_root.clone(),
            suffix: config.page_suffix.clone(),
            files,
            routes,
        })
    }

    /// Derives the candidate page file for a URL.
    ///
    /// ```
    /// use feather_middleware::stages::PageResolver;
    ///
    /// assert_eq!(PageResolver::candidate("", ".feather.html"), "index.feather.html");
    /// assert_eq!(PageResolver::candidate("/docs/", ".feather.html"), "/docs/index.feather.html");
    /// assert_eq!(PageResolver::candidate("/about?x=1", ".feather.html"), "/about.feather.html");
    /// assert_eq!(PageResolver::candidate("/logo.png", ".feather.html"), "/logo.png");
    /// ```
    pub fn candidate(url: &str, suffix: &str) -> String {
        let mut page = match path_of(url) {
            "" => "index".to_string(),
            path => path.to_string(),
        };
        if page.ends_with('/') {
            page.push_str("index");
        }
        if !page.contains('.') {
            page.push_str(suffix);
        }
        page
    }

    /// Resolves the page name for a URL (path plus query), if any.
    ///
    /// A known page file wins; otherwise the first page route whose regex
    /// matches the raw URL.
    pub fn resolve(&self, url: &str) -> Option<String> {
        let candidate = Self::candidate(url, &self.suffix);
        let file = self.public_root.join(candidate.trim_start_matches('/'));
        if self.files.contains_page(&file) {
            return Some(candidate);
        }

        self.routes
            .iter()
            .find(|(regex, _)| regex.is_match(url))
            .map(|(_, page)| page.clone())
    }
}

impl Middleware for PageResolver {
    fn name(&self) -> &'static str {
        "page_resolver"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            if let Some(page) = self.resolve(ctx.url()) {
                tracing::trace!(url = %ctx.url(), page = %page, "templated page request");
                ctx.set_page(page);
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

    fn resolver(files: FileIndex, routes: &[(&str, &str)]) -> PageResolver {
        let mut builder = FeatherConfig::builder().public_root("/srv/public");
        for (pattern, page) in routes {
            builder = builder.page_route(*pattern, *page);
        }
        PageResolver::new(&builder.build(), Arc::new(files)).unwrap()
    }

    #[test]
    fn test_file_match_wins() {
        let files = FileIndex::new().with_page("/srv/public/about.feather.html");
        let r = resolver(files, &[("^/about$", "aboutPage")]);
        assert_eq!(r.resolve("/about").as_deref(), Some("/about.feather.html"));
    }

    #[test]
    fn test_root_resolves_index() {
        let files = FileIndex::new().with_page("/srv/public/index.feather.html");
        let r = resolver(files, &[]);
        assert_eq!(r.resolve("/").as_deref(), Some("/index.feather.html"));
    }

    #[test]
    fn test_page_route_fallback() {
        let r = resolver(FileIndex::new(), &[("^/about$", "aboutPage")]);
        assert_eq!(r.resolve("/about").as_deref(), Some("aboutPage"));
        assert_eq!(r.resolve("/ABOUT").as_deref(), Some("aboutPage"));
        assert_eq!(r.resolve("/about/team"), None);
    }

    #[test]
    fn test_routes_checked_in_declaration_order() {
        let r = resolver(
            FileIndex::new(),
            &[("^/blog", "blogIndex"), ("^/blog/post", "blogPost")],
        );
        assert_eq!(r.resolve("/blog/post/1").as_deref(), Some("blogIndex"));
    }

    #[test]
    fn test_route_sees_query_string() {
        let r = resolver(FileIndex::new(), &[(r"\?preview=1", "preview")]);
        assert_eq!(r.resolve("/anything?preview=1").as_deref(), Some("preview"));
    }

    #[test]
    fn test_invalid_route_rejected() {
        let config = FeatherConfig::builder().page_route("(", "broken").build();
        assert!(PageResolver::new(&config, Arc::new(FileIndex::new())).is_err());
    }

    #[tokio::test]
    async fn test_stage_is_deterministic_and_never_rejects() {
        let r = resolver(FileIndex::new(), &[("^/about$", "aboutPage")]);

        for _ in 0..2 {
            let mut ctx = RequestContext::new(Method::GET, "/about");
            let err = r
                .process(&mut ctx, http::Request::new(Full::new(Bytes::new())), Next::end())
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert!(ctx.is_page());
            assert_eq!(ctx.page(), Some("aboutPage"));
        }

        let mut ctx = RequestContext::new(Method::GET, "/logo.png");
        let _ = r
            .process(&mut ctx, http::Request::new(Full::new(Bytes::new())), Next::end())
            .await;
        assert!(!ctx.is_page());
    }
}
