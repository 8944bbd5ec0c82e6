//! Cookie-backed session stage.
//!
//! Reads the session id from the [`Cookies`] extension, or issues a new one
//! (UUID v7) and sets it on the response.

use super::cookies::Cookies;
use crate::context::RequestContext;
use crate::middleware::{Middleware, Next};
use crate::types::{Request, Response};
use feather_config::SessionConfig;
use feather_core::{BoxFuture, StageResult};
use http::{header, HeaderValue};
use uuid::Uuid;

/// Session attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    is_new: bool,
}

impl Session {
    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True if the session was created by this request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Stage attaching a [`Session`] extension.
///
/// Runs after the cookie parser; without a [`Cookies`] extension every
/// request starts a new session.
#[derive(Debug, Clone)]
pub struct SessionMiddleware {
    cookie_name: String,
    path: String,
}

impl SessionMiddleware {
    /// Creates the stage from the session configuration.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            path: config.path.clone(),
        }
    }

    fn set_cookie(&self, id: &str) -> Option<HeaderValue> {
        HeaderValue::from_str(&format!("{}={id}; Path={}; HttpOnly", self.cookie_name, self.path)).ok()
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult<Response>> {
        Box::pin(async move {
            let existing = ctx
                .get_extension::<Cookies>()
                .and_then(|c| c.get(&self.cookie_name))
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            let session = match existing {
                Some(id) => Session { id, is_new: false },
                None => Session {
                    id: Uuid::now_v7().to_string(),
                    is_new: true,
                },
            };
            let new_id = session.is_new.then(|| session.id.clone());
            ctx.set_extension(session);

            let mut response = next.run(ctx, request).await?;
            if let Some(value) = new_id.as_deref().and_then(|id| self.set_cookie(id)) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;

    fn ok() -> Next<'static> {
        Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::text(StatusCode::OK, "ok")) }))
    }

    fn request() -> Request {
        http::Request::new(Full::new(Bytes::new()))
    }

    #[tokio::test]
    async fn test_new_session_sets_cookie() {
        let stage = SessionMiddleware::new(&SessionConfig::default());
        let mut ctx = RequestContext::new(Method::GET, "/");

        let response = stage.process(&mut ctx, request(), ok()).await.unwrap();
        let session = ctx.get_extension::<Session>().unwrap();
        assert!(session.is_new());

        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("feather.sid={}", session.id())));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_existing_session_is_reused() {
        let stage = SessionMiddleware::new(&SessionConfig::default());
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.set_extension(Cookies::parse("feather.sid=abc", false));

        let response = stage.process(&mut ctx, request(), ok()).await.unwrap();
        assert_eq!(ctx.get_extension::<Session>().unwrap().id(), "abc");
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
