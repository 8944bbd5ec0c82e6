//! Request-time error types.
//!
//! Every stage in the pipeline either produces a response or fails with a
//! [`StageError`]. The error stages at the tail of the pipeline classify the
//! failure by variant: a missing resource is expected traffic, everything else
//! is a fault worth a full log entry.

use http::StatusCode;
use std::fmt::Write as _;
use thiserror::Error;

/// Message carried by [`StageError::ResourceNotFound`].
pub const NOT_FOUND_MESSAGE: &str = "404 - The file you have requested could not be found.";

/// Result type alias for stage execution.
pub type StageResult<T> = Result<T, StageError>;

/// Failure raised by a stage while processing a request.
#[derive(Error, Debug)]
pub enum StageError {
    /// No stage could serve the request and no 404 page exists.
    #[error("{}: {url}", NOT_FOUND_MESSAGE)]
    ResourceNotFound {
        /// The URL that was being served when the chain ran out.
        url: String,
    },

    /// A collaborator rejected the request with a specific status.
    #[error("{message}")]
    Status {
        /// HTTP status to render.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },

    /// Any other failure raised during stage execution.
    #[error("{message}")]
    Uncaught {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl StageError {
    /// Creates a resource-not-found error for the given URL.
    #[must_use]
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::ResourceNotFound { url: url.into() }
    }

    /// Creates an error that renders with a specific status.
    #[must_use]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates an uncaught error with a message.
    #[must_use]
    pub fn uncaught(message: impl Into<String>) -> Self {
        Self::Uncaught {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an uncaught error wrapping an underlying cause.
    #[must_use]
    pub fn uncaught_with(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Uncaught {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true if this is the resource-not-found variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// Returns the HTTP status used when rendering this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Status { status, .. } => *status,
            Self::Uncaught { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error together with its full source chain.
    ///
    /// Used for log entries and for debug-mode error pages.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let _ = write!(out, "\n  caused by: {err}");
            source = err.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_carries_sentinel() {
        let err = StageError::not_found("/404.html");
        assert_eq!(
            err.to_string(),
            "404 - The file you have requested could not be found.: /404.html"
        );
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_uncaught_is_server_error() {
        let err = StageError::uncaught("boom");
        assert!(!err.is_not_found());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_status_error_keeps_status() {
        let err = StageError::status(StatusCode::PAYLOAD_TOO_LARGE, "request entity too large");
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_detail_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = StageError::uncaught_with("static handler failed", io);
        let detail = err.detail();
        assert!(detail.starts_with("static handler failed"));
        assert!(detail.contains("caused by: disk on fire"));
    }
}
