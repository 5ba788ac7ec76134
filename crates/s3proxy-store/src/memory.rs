//! In-memory object store for testing and local runs

use crate::{ObjectMetadata, ObjectStore, Result, StoreError, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
struct MemoryObject {
    data: Bytes,
    metadata: ObjectMetadata,
}

/// An in-memory object store.
///
/// Besides plain objects it can be told to fail specific keys, and it keeps
/// the list of keys it was asked for.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<DashMap<String, MemoryObject>>,
    failures: Arc<DashMap<String, StoreError>>,
    index_suffix: Arc<Mutex<Option<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MemoryObjectStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object. `content_length` is filled in from the data when unset.
    pub fn put_object(&self, key: impl Into<String>, data: impl Into<Bytes>, mut metadata: ObjectMetadata) {
        let data = data.into();
        if metadata.content_length.is_none() {
            metadata.content_length = Some(data.len() as i64);
        }
        self.objects.insert(key.into(), MemoryObject { data, metadata });
    }

    /// Make every `get` of `key` fail with `error`
    pub fn fail_key(&self, key: impl Into<String>, error: StoreError) {
        self.failures.insert(key.into(), error);
    }

    /// Configure the bucket website index suffix
    pub fn set_index_suffix(&self, suffix: impl Into<String>) {
        *self.index_suffix.lock() = Some(suffix.into());
    }

    /// Keys requested through `get`, in order
    pub fn requested_keys(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Get the number of objects stored
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<StoredObject> {
        self.requests.lock().push(key.to_string());

        if let Some(err) = self.failures.get(key) {
            return Err(err.value().clone());
        }

        let object = self
            .objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NoSuchKey("The specified key does not exist.".to_string()))?;

        Ok(StoredObject {
            metadata: object.metadata,
            body: stream::once(async move { Ok(object.data) }).boxed(),
        })
    }

    async fn website_index_suffix(&self) -> Result<String> {
        self.index_suffix.lock().clone().ok_or_else(|| {
            StoreError::service(
                "NoSuchWebsiteConfiguration",
                "The specified bucket does not have a website configuration",
            )
        })
    }
}
