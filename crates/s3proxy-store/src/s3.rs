//! S3 object store bound to a single bucket

use crate::{ObjectBody, ObjectMetadata, ObjectStore, Result, StoreError, StoredObject};
use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as SmithyDateTime};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::instrument;

/// Connection settings for one bucket
#[derive(Clone)]
pub struct S3StoreConfig {
    /// Access key ID
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
    /// Region the bucket lives in
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Custom endpoint (S3-compatible services); enables path-style addressing
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for S3StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StoreConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"...")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl S3StoreConfig {
    /// Create a config for AWS proper
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            bucket: bucket.into(),
            endpoint: None,
        }
    }

    /// Point the client at a custom endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// S3 object store client
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from static credentials. No network traffic happens here.
    pub fn new(config: S3StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key,
            config.secret_key,
            None,
            None,
            "s3proxy-site",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket,
        }
    }

    /// Bucket this store reads from
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<StoredObject> {
        // Request paths arrive with their leading slash
        let key = key.trim_start_matches('/');

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify)?;

        let metadata = ObjectMetadata {
            cache_control: output.cache_control().map(str::to_owned),
            content_disposition: output.content_disposition().map(str::to_owned),
            content_encoding: output.content_encoding().map(str::to_owned),
            content_language: output.content_language().map(str::to_owned),
            content_length: output.content_length(),
            content_range: output.content_range().map(str::to_owned),
            content_type: output.content_type().map(str::to_owned),
            etag: output.e_tag().map(str::to_owned),
            expires: output.expires_string().map(str::to_owned),
            last_modified: output.last_modified().and_then(to_chrono),
        };

        Ok(StoredObject {
            metadata,
            body: into_object_body(output.body),
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn website_index_suffix(&self) -> Result<String> {
        let output = self
            .client
            .get_bucket_website()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(classify)?;

        output
            .index_document()
            .map(|doc| doc.suffix().to_owned())
            .ok_or_else(|| {
                StoreError::InvalidResponse(format!(
                    "website configuration for bucket {} has no index document",
                    self.bucket
                ))
            })
    }
}

/// Map an SDK error onto the store taxonomy
fn classify<E>(err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            let service = context.err();
            let message = service.message().unwrap_or_default().to_string();

            match service.code() {
                // A 404 without an error body surfaces as the generic NotFound code
                Some("NoSuchKey") | Some("NotFound") => StoreError::NoSuchKey(message),
                Some("NoSuchBucket") => StoreError::NoSuchBucket(message),
                Some(code) => StoreError::service(code, message),
                None if status == 404 => StoreError::NoSuchKey(message),
                None => StoreError::service(format!("HTTP{status}"), message),
            }
        }
        _ => StoreError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

fn to_chrono(timestamp: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

/// Adapt the SDK byte stream. The stream ends after the first read error.
fn into_object_body(body: ByteStream) -> ObjectBody {
    stream::unfold(Some(body), |state| async move {
        let mut body = state?;
        match body.next().await {
            Some(Ok(chunk)) => Some((Ok(chunk), Some(body))),
            Some(Err(err)) => Some((Err(std::io::Error::other(err)), None)),
            None => None,
        }
    })
    .boxed()
}
