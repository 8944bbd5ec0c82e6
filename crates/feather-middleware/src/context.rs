//! Per-request context.
//!
//! [`RequestContext`] is created when a request enters the pipeline and is
//! owned by that request until its response is produced. Stages read and
//! rewrite the *current* URL through it; the *original* URL is a snapshot
//! taken at creation and never changes.
//!
//! Stages that need to observe the final response (after error stages have
//! rendered it) register a completion hook with [`RequestContext::on_complete`].

use crate::types::{Request, Response};
use http::{HeaderMap, Method, Version};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Context that flows through the pipeline.
///
/// # Example
///
/// ```
/// use feather_middleware::context::RequestContext;
///
/// let mut ctx = RequestContext::new(http::Method::GET, "/about?x=1");
/// assert_eq!(ctx.path(), "/about");
///
/// ctx.set_url("/about-us");
/// assert_eq!(ctx.url(), "/about-us");
/// assert_eq!(ctx.original_url(), "/about?x=1");
/// assert!(ctx.is_rewritten());
/// ```
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    method: Method,
    version: Version,
    url: String,
    original_url: String,
    is_page: bool,
    page: Option<String>,
    remote_addr: Option<SocketAddr>,
    headers: HeaderMap,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    completion_hooks: CompletionHooks,
}

/// Callback run once with the final response.
pub type CompletionHook = Box<dyn FnOnce(&RequestContext, &Response) + Send + Sync>;

#[derive(Default)]
struct CompletionHooks(Vec<CompletionHook>);

impl fmt::Debug for CompletionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hook(s)", self.0.len())
    }
}

impl RequestContext {
    /// Creates a context for a bare method and URL.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            request_id: Uuid::now_v7(),
            method,
            version: Version::HTTP_11,
            original_url: url.clone(),
            url,
            is_page: false,
            page: None,
            remote_addr: None,
            headers: HeaderMap::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
            completion_hooks: CompletionHooks::default(),
        }
    }

    /// Creates a context from an incoming request.
    ///
    /// Snapshots the method, version, headers, and the request target
    /// (path plus query) as both the current and the original URL.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let url = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

        let mut ctx = Self::new(request.method().clone(), url);
        ctx.version = request.version();
        ctx.headers = request.headers().clone();
        ctx
    }

    /// Sets the transport-level peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Returns the request ID (UUID v7).
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the HTTP version of the request.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the current URL (path plus query).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Rewrites the current URL. The original URL is unaffected.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Returns the URL as received, before any rewrite.
    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Returns true if a stage has rewritten the current URL.
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        self.url != self.original_url
    }

    /// Returns the path component of the current URL.
    #[must_use]
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }

    /// Returns true if the request targets a templated page.
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.is_page
    }

    /// Returns the resolved page name, if any.
    #[must_use]
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    /// Marks the request as targeting the templated page `page`.
    pub fn set_page(&mut self, page: impl Into<String>) {
        self.is_page = true;
        self.page = Some(page.into());
    }

    /// Returns the transport-level peer address, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the request headers snapshot.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a request header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns when the request entered the pipeline.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request entered the pipeline.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    ///
    /// ```
    /// use feather_middleware::context::RequestContext;
    ///
    /// struct Visited(u32);
    ///
    /// let mut ctx = RequestContext::new(http::Method::GET, "/");
    /// ctx.set_extension(Visited(3));
    /// assert_eq!(ctx.get_extension::<Visited>().unwrap().0, 3);
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl RequestContext {
    /// Registers a callback to run with the final response.
    ///
    /// Hooks run in registration order, after error stages, and never
    /// change the response.
    pub fn on_complete<F>(&mut self, hook: F)
    where
        F: FnOnce(&RequestContext, &Response) + Send + Sync + 'static,
    {
        self.completion_hooks.0.push(Box::new(hook));
    }

    /// Runs and drops every registered completion hook.
    ///
    /// Called by the pipeline once the response is final.
    pub fn complete(&mut self, response: &Response) {
        let hooks = std::mem::take(&mut self.completion_hooks.0);
        for hook in hooks {
            hook(self, response);
        }
    }
}

/// Returns the path component of a request target.
pub(crate) fn path_of(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or("")
}
