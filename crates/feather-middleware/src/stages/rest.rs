//! REST sub-router.
//!
//! Resources are mounted at `<prefix>/<name>`; anything after the resource
//! name is handed to the resource's handler as the sub-path. Requests outside
//! the prefix, or for unknown resources, continue down the chain.

use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use feather_core::{BoxFuture, StageResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Handler for one REST resource.
pub trait RestHandler: Send + Sync + 'static {
    /// Handles a request for this resource.
    ///
    /// `subpath` is the part of the path after `<prefix>/<name>`, without a
    /// leading slash (empty for the collection itself).
    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        subpath: String,
    ) -> BoxFuture<'a, StageResult<Response>>;
}

/// A named REST resource.
#[derive(Clone)]
pub struct RestResource {
    name: String,
    handler: Arc<dyn RestHandler>,
}

impl RestResource {
    /// Creates a resource mounted under `name`.
    pub fn new(name: impl Into<String>, handler: impl RestHandler) -> Self {
        Self {
            name: name.into().trim_matches('/').to_string(),
            handler: Arc::new(handler),
        }
    }

    /// The resource name (its first path segment under the prefix).
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for RestResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestResource").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Descriptor of one mounted REST route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestRoute {
    /// The resource name.
    pub resource: String,
    /// The full mount path.
    pub path: String,
}

/// Descriptor of all mounted REST routes, returned to the pipeline's caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestRoutes {
    /// The URL prefix.
    pub prefix: String,
    /// Mounted routes in registration order.
    pub routes: Vec<RestRoute>,
}

impl RestRoutes {
    /// Returns the route for a resource name.
    pub fn get(&self, resource: &str) -> Option<&RestRoute> {
        self.routes.iter().find(|r| r.resource == resource)
    }
}

/// Stage dispatching `<prefix>/<name>/...` to REST resources.
///
/// # Example
///
/// ```
/// use feather_middleware::stages::rest::RestRouter;
///
/// let router = RestRouter::new("/_rest", &[]);
/// assert_eq!(router.routes().prefix, "/_rest");
/// assert!(router.routes().routes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RestRouter {
    prefix: String,
    resources: Vec<RestResource>,
}

impl RestRouter {
    /// Creates a router mounting `resources` under `prefix`.
    pub fn new(prefix: &str, resources: &[RestResource]) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            resources: resources.to_vec(),
        }
    }

    /// Returns the descriptor of mounted routes.
    pub fn routes(&self) -> RestRoutes {
        RestRoutes {
            prefix: self.prefix.clone(),
            routes: self
                .resources
                .iter()
                .map(|r| RestRoute {
                    resource: r.name.clone(),
                    path: format!("{}/{}", self.prefix, r.name),
                })
                .collect(),
        }
    }

    /// Splits a path into (resource, subpath) if it lies under the prefix.
    fn split<'p>(&self, path: &'p str) -> Option<(&'p str, &'p str)> {
        let rest = path.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let (name, subpath) = rest.split_once('/').unwrap_or((rest, ""));
        (!name.is_empty()).then_some((name, subpath))
    }
}

impl Middleware for RestRouter {
    fn name(&self) -> &'static str {
        "rest_router"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            let target = self.split(ctx.path()).and_then(|(name, subpath)| {
                self.resources
                    .iter()
                    .find(|r| r.name == name)
                    .map(|r| (Arc::clone(&r.handler), subpath.to_string()))
            });

            match target {
                Some((handler, subpath)) => {
                    tracing::debug!(url = %ctx.url(), "dispatching REST request");
                    handler.handle(ctx, request, subpath).await
                }
                None => next.run(ctx, request).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::{BodyExt, Full};

    struct Echo;

    impl RestHandler for Echo {
        fn handle<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            _request: Request,
            subpath: String,
        ) -> BoxFuture<'a, StageResult<Response>> {
            Box::pin(async move {
                Ok(Response::text(
                    StatusCode::OK,
                    &format!("{} {}", ctx.method(), subpath),
                ))
            })
        }
    }

    fn request() -> Request {
        http::Request::new(Full::new(Bytes::new()))
    }

    #[test]
    fn test_routes_descriptor() {
        let router = RestRouter::new("/_rest/", &[RestResource::new("users", Echo)]);
        let routes = router.routes();
        assert_eq!(routes.get("users").unwrap().path, "/_rest/users");
    }

    #[tokio::test]
    async fn test_dispatches_to_resource() {
        let router = RestRouter::new("/_rest", &[RestResource::new("users", Echo)]);
        let mut ctx = RequestContext::new(Method::DELETE, "/_rest/users/42?force=1");

        let response = router
            .process(&mut ctx, request(), Next::end())
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "DELETE 42");
    }

    #[tokio::test]
    async fn test_unknown_resource_continues() {
        let router = RestRouter::new("/_rest", &[RestResource::new("users", Echo)]);
        let mut ctx = RequestContext::new(Method::GET, "/_rest/orders");

        let err = router
            .process(&mut ctx, request(), Next::end())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_prefix_must_be_whole_segment() {
        let router = RestRouter::new("/_rest", &[]);
        assert_eq!(router.split("/_restful/users"), None);
        assert_eq!(router.split("/_rest/users"), Some(("users", "")));
    }
}
