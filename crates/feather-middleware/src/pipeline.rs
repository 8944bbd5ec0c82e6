//! Pipeline assembly.
//!
//! The stage order is fixed by [`PipelineBuilder::build`]:
//!
//! ```text
//! [access_log] [compression]
//! cookie_parser → session → body_parser → page_resolver
//! → <before_router stages> → router → rewrite_redirect → rest_router
//! → static_files → not_found → static_files_404 → resource_missing
//! errors: error_reporter → error_responder
//! ```
//!
//! `compression` is present when gzip publishing is enabled and
//! `access_log` when the logger has `http.access` enabled at `info`. Both
//! are prepended, access logging outermost. Collaborators (cookie parser,
//! session, body parser, REST router, static handler, error responder) can
//! be replaced without changing their position.

use crate::bootstrap::Dependencies;
use crate::context::RequestContext;
use crate::error::BuildResult;
use crate::ignore::IgnorePathMatcher;
use crate::middleware::{BoxedErrorMiddleware, BoxedMiddleware, Middleware, Next};
use crate::stages::access_log::{AccessLogMiddleware, ACCESS_CATEGORY};
use crate::stages::errors::{fallback_response, ErrorReporter, ErrorResponder};
use crate::stages::rest::RestRoutes;
use crate::stages::{
    BodyParser, BodyParserGate, CompressionMiddleware, CookieParser, NotFoundRedirect, PageResolver,
    ResourceMissing, RestRouter, RewriteRedirect, SessionMiddleware, StaticFiles,
};
use crate::types::{Request, Response};
use feather_config::FeatherConfig;
use feather_core::{BoxFuture, Level, SharedCache, StageError, StageResult};
use std::sync::Arc;

/// An assembled, immutable pipeline.
///
/// Shared read-only between concurrent requests.
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    error_stages: Vec<BoxedErrorMiddleware>,
}

impl Pipeline {
    /// Creates a pipeline from explicit stage lists.
    pub fn new(stages: Vec<BoxedMiddleware>, error_stages: Vec<BoxedErrorMiddleware>) -> Self {
        Self {
            stages,
            error_stages,
        }
    }

    /// Runs a request through the pipeline.
    ///
    /// A failure skips the remaining normal stages and is offered to the
    /// error stages in order; if all of them re-raise, the answer is a plain
    /// 500. Completion hooks registered on `ctx` run with the final response.
    pub async fn handle(&self, ctx: &mut RequestContext, request: Request) -> Response {
        let response = match self.build_chain().run(ctx, request).await {
            Ok(response) => response,
            Err(error) => self.handle_error(error, ctx).await,
        };
        ctx.complete(&response);
        response
    }

    /// Runs a request with a context derived from the request itself.
    pub async fn serve(&self, request: Request) -> Response {
        let mut ctx = RequestContext::from_request(&request);
        self.handle(&mut ctx, request).await
    }

    fn build_chain(&self) -> Next<'_> {
        self.stages
            .iter()
            .rev()
            .fold(Next::end(), |next, stage| Next::new(stage.as_ref(), next))
    }

    async fn handle_error(&self, mut error: StageError, ctx: &mut RequestContext) -> Response {
        for stage in &self.error_stages {
            match stage.handle(error, ctx).await {
                Ok(response) => return response,
                Err(raised) => error = raised,
            }
        }
        tracing::error!(
            request_id = %ctx.request_id(),
            error = %error.detail(),
            "no error stage handled the failure"
        );
        fallback_response()
    }

    /// Names of the normal stages, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Names of the error stages, in order.
    pub fn error_stage_names(&self) -> Vec<&'static str> {
        self.error_stages.iter().map(|s| s.name()).collect()
    }

    /// Number of normal and error stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len() + self.error_stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("error_stages", &self.error_stage_names())
            .finish()
    }
}

/// A built pipeline and the REST routes it mounts.
#[derive(Debug)]
pub struct BuiltPipeline {
    /// The pipeline.
    pub pipeline: Pipeline,
    /// Descriptor of the mounted REST routes.
    pub rest_routes: RestRoutes,
}

/// Gives a shared stage a different name at a second position.
struct Labeled {
    label: &'static str,
    inner: BoxedMiddleware,
}

impl Middleware for Labeled {
    fn name(&self) -> &'static str {
        self.label
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        self.inner.process(ctx, request, next)
    }
}

/// Assembles a [`Pipeline`] from configuration and resolved dependencies.
///
/// # Example
///
/// ```
/// use feather_config::FeatherConfig;
/// use feather_core::fixtures::RecordingLogger;
/// use feather_core::{Level, MemoryCache};
/// use feather_middleware::bootstrap::Dependencies;
/// use feather_middleware::files::FileIndex;
/// use feather_middleware::stages::RewriteRouter;
/// use feather_middleware::PipelineBuilder;
/// use std::sync::Arc;
///
/// let deps = Dependencies::new(
///     Arc::new(FileIndex::new()),
///     Arc::new(RecordingLogger::new(Level::Warn)),
///     Arc::new(RewriteRouter::default()),
/// );
/// let built = PipelineBuilder::new(Arc::new(FeatherConfig::default()), deps, Arc::new(MemoryCache::new()))
///     .build()
///     .unwrap();
///
/// assert_eq!(built.pipeline.stage_names()[0], "cookie_parser");
/// assert_eq!(built.rest_routes.prefix, "/_rest");
/// ```
pub struct PipelineBuilder {
    config: Arc<FeatherConfig>,
    deps: Dependencies,
    cache: Arc<dyn SharedCache>,
    cookie_parser: Option<BoxedMiddleware>,
    session: Option<BoxedMiddleware>,
    body_parser: Option<BoxedMiddleware>,
    rest_router: Option<RestRouter>,
    static_files: Option<BoxedMiddleware>,
    error_responder: Option<BoxedErrorMiddleware>,
    before_router: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates a builder. `cache` is where the error reporter re-resolves
    /// the logger for each failure.
    pub fn new(config: Arc<FeatherConfig>, deps: Dependencies, cache: Arc<dyn SharedCache>) -> Self {
        Self {
            config,
            deps,
            cache,
            cookie_parser: None,
            session: None,
            body_parser: None,
            rest_router: None,
            static_files: None,
            error_responder: None,
            before_router: Vec::new(),
        }
    }

    /// Replaces the cookie parser.
    pub fn cookie_parser(mut self, stage: BoxedMiddleware) -> Self {
        self.cookie_parser = Some(stage);
        self
    }

    /// Replaces the session stage.
    pub fn session(mut self, stage: BoxedMiddleware) -> Self {
        self.session = Some(stage);
        self
    }

    /// Replaces the body parser. Ignore rules still apply to it.
    pub fn body_parser(mut self, stage: BoxedMiddleware) -> Self {
        self.body_parser = Some(stage);
        self
    }

    /// Replaces the REST router.
    pub fn rest_router(mut self, router: RestRouter) -> Self {
        self.rest_router = Some(router);
        self
    }

    /// Replaces the static handler (used at both static positions).
    pub fn static_files(mut self, stage: BoxedMiddleware) -> Self {
        self.static_files = Some(stage);
        self
    }

    /// Replaces the terminal error stage.
    pub fn error_responder(mut self, stage: BoxedErrorMiddleware) -> Self {
        self.error_responder = Some(stage);
        self
    }

    /// Adds stages to run immediately before the router, after any already
    /// added. Relative order is preserved.
    pub fn before_router(mut self, stages: Vec<BoxedMiddleware>) -> Self {
        self.before_router.extend(stages);
        self
    }

    /// Builds the pipeline.
    ///
    /// Ignore rules and page routes are compiled here; an invalid pattern
    /// fails the build.
    pub fn build(self) -> BuildResult<BuiltPipeline> {
        let config = &self.config;
        let logger = &self.deps.logger;
        let gzip = config.resources.publish.gzip;

        let matcher = Arc::new(IgnorePathMatcher::from_config(&config.connect.body_parser.ignore_paths)?);
        let page_resolver = PageResolver::new(config, Arc::clone(&self.deps.files))?;
        let rest_router = self
            .rest_router
            .unwrap_or_else(|| RestRouter::new(&config.rest.prefix, self.deps.files.rest_resources()));
        let rest_routes = rest_router.routes();

        let cookie_parser = self
            .cookie_parser
            .unwrap_or_else(|| Arc::new(CookieParser::new(config.connect.cookie_parser.secret.clone())));
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(SessionMiddleware::new(&config.connect.session)));
        let body_parser = self
            .body_parser
            .unwrap_or_else(|| Arc::new(BodyParser::new(config.connect.body_parser.limit_bytes)));
        let static_files = self.static_files.unwrap_or_else(|| {
            Arc::new(StaticFiles::new(&config.public_root).precompressed_gzip(gzip))
        });

        let mut stages: Vec<BoxedMiddleware> = vec![
            cookie_parser,
            session,
            Arc::new(BodyParserGate::new(matcher, body_parser, Arc::clone(logger))),
            Arc::new(page_resolver),
        ];
        stages.extend(self.before_router);
        let tail: [BoxedMiddleware; 7] = [
            Arc::clone(&self.deps.router),
            Arc::new(RewriteRedirect),
            Arc::new(rest_router),
            Arc::clone(&static_files),
            Arc::new(NotFoundRedirect::new(config.connect.not_found.clone(), Arc::clone(logger))),
            Arc::new(Labeled {
                label: "static_files_404",
                inner: static_files,
            }),
            Arc::new(ResourceMissing),
        ];
        stages.extend(tail);

        if gzip {
            stages.insert(0, Arc::new(CompressionMiddleware::new()));
        }
        if logger.is_enabled(Level::Info, ACCESS_CATEGORY) {
            let worker_id = config.worker_id.unwrap_or(0);
            stages.insert(0, Arc::new(AccessLogMiddleware::new(Arc::clone(logger), worker_id)));
        }

        let error_stages: Vec<BoxedErrorMiddleware> = vec![
            Arc::new(ErrorReporter::new(self.cache)),
            self.error_responder
                .unwrap_or_else(|| Arc::new(ErrorResponder::new(config.debug))),
        ];

        let pipeline = Pipeline::new(stages, error_stages);
        tracing::debug!(
            stages = ?pipeline.stage_names(),
            rest_routes = rest_routes.routes.len(),
            "request pipeline built"
        );

        Ok(BuiltPipeline {
            pipeline,
            rest_routes,
        })
    }
}
