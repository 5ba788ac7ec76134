//! Error types for configuration and request handling

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use s3proxy_store::StoreError;
use thiserror::Error;

/// Startup configuration errors. These abort the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not specified")]
    Missing(&'static str),

    #[error("{source} in configuration at position {position}")]
    AtPosition {
        position: usize,
        source: Box<ConfigError>,
    },

    #[error("Must specify one or more configurations")]
    NoSites,

    #[error("Failed to parse user {user} at position {position}")]
    InvalidUser { user: String, position: usize },

    #[error("invalid site configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Errors surfaced to clients while fetching an object.
///
/// Store failures collapse into three buckets so that clients learn
/// little about the backend: missing keys are 404, anything else the store rejects is 401,
/// and failures to reach the store are 500.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ProxyError {
    fn from(err: StoreError) -> Self {
        let text = err.to_string();
        match err {
            StoreError::NoSuchKey(_) => Self::NotFound(text),
            // A missing bucket looks the same as any other store-side refusal
            StoreError::NoSuchBucket(_) | StoreError::Service { .. } => Self::Unauthorized(text),
            StoreError::Transport(_) | StoreError::InvalidResponse(_) => Self::Internal(text),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classification() {
        let err = ProxyError::from(StoreError::NoSuchKey("The specified key does not exist.".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "NoSuchKey: The specified key does not exist.");

        let err = ProxyError::from(StoreError::NoSuchBucket("The specified bucket does not exist".into()));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = ProxyError::from(StoreError::service("AccessDenied", "Access Denied"));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = ProxyError::from(StoreError::service("SlowDown", "Please reduce your request rate."));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = ProxyError::from(StoreError::Transport("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[tokio::test]
    async fn test_into_response_body_is_error_text() {
        let response = ProxyError::NotFound("NoSuchKey: gone".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"NoSuchKey: gone");
    }
}
