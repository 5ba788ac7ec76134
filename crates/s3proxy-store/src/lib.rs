//! # s3proxy store
//!
//! Object storage boundary for the s3proxy gateway.
//!
//! This crate provides:
//! - **ObjectStore trait**: fetch an object by key, read a bucket's website index suffix
//! - **S3 backend**: `aws-sdk-s3` client bound to one bucket
//! - **Memory backend**: in-process store for tests and local runs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Gateway (fetch handler)         │
//! ├─────────────────────────────────────────┤
//! │           ObjectStore Trait             │
//! ├────────────────────┬────────────────────┤
//! │   S3ObjectStore    │ MemoryObjectStore  │
//! ├────────────────────┴────────────────────┤
//! │        S3 / S3-compatible endpoint      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use s3proxy_store::{ObjectStore, S3ObjectStore, S3StoreConfig};
//!
//! let store = S3ObjectStore::new(S3StoreConfig::new("key", "secret", "eu-west-1", "my-bucket"));
//! let object = store.get("/index.html").await?;
//! ```

pub mod error;
pub mod memory;
pub mod s3;

pub use error::{Result, StoreError};
pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3StoreConfig};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

/// Streaming object body.
///
/// Dropping the stream releases the underlying connection, so a response
/// that is abandoned half-way never leaks the store read.
pub type ObjectBody = BoxStream<'static, std::io::Result<Bytes>>;

/// Metadata returned with every fetched object. Absent fields stay `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_length: Option<i64>,
    pub content_range: Option<String>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub expires: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A fetched object: metadata plus its body stream
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    pub body: ObjectBody,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("metadata", &self.metadata)
            .field("body", &"...")
            .finish()
    }
}

/// Trait for object storage backends
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored under `key`
    async fn get(&self, key: &str) -> Result<StoredObject>;

    /// Read the index document suffix from the bucket's website configuration
    async fn website_index_suffix(&self) -> Result<String>;
}
