//! Common types used throughout the pipeline.
//!
//! This module re-exports HTTP request and response types used by stages.

use bytes::Bytes;
use feather_core::{StageError, StageResult};
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building common responses.
pub trait ResponseExt {
    /// Creates a response with the given status, content type, and body.
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response;

    /// Creates a plain-text response.
    fn text(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON response.
    fn json(status: StatusCode, value: &serde_json::Value) -> Response;

    /// Creates an empty `303 See Other` response pointing at `location`.
    ///
    /// Fails if `location` is not a valid header value.
    fn see_other(location: &str) -> StageResult<Response>;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response {
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    fn text(status: StatusCode, message: &str) -> Response {
        Self::with_body(status, "text/plain; charset=utf-8", message.to_string())
    }

    fn json(status: StatusCode, value: &serde_json::Value) -> Response {
        Self::with_body(status, "application/json", value.to_string())
    }

    fn see_other(location: &str) -> StageResult<Response> {
        let location = HeaderValue::from_str(location).map_err(|e| {
            StageError::uncaught_with(format!("invalid redirect location {location:?}"), e)
        })?;
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::SEE_OTHER;
        response.headers_mut().insert(header::LOCATION, location);
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response() {
        let response = Response::text(StatusCode::BAD_REQUEST, "Invalid input");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(StatusCode::OK, &serde_json::json!({"ok": true}));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_see_other() {
        let response = Response::see_other("/404.html").unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/404.html");
    }

    #[test]
    fn test_see_other_rejects_invalid_location() {
        assert!(Response::see_other("/bad\nlocation").is_err());
    }
}
