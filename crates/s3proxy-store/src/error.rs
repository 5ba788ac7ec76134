//! Error types for the s3proxy-store crate

use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by an [`ObjectStore`](crate::ObjectStore).
///
/// The variant is decided by the backend, so callers never inspect the
/// concrete client error to tell a store-side rejection from a transport
/// failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested key does not exist
    #[error("NoSuchKey: {0}")]
    NoSuchKey(String),

    /// The configured bucket does not exist
    #[error("NoSuchBucket: {0}")]
    NoSuchBucket(String),

    /// Any other error reported by the store itself (access denied,
    /// throttling, missing website configuration, ...)
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// The request never produced a store answer
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with something we could not use
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Create a service error from an error code and message
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the store itself produced this error
    pub fn is_store_reported(&self) -> bool {
        matches!(
            self,
            Self::NoSuchKey(_) | Self::NoSuchBucket(_) | Self::Service { .. }
        )
    }
}
