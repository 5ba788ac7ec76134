//! Object fetch handler: the innermost stage of every site chain

use crate::error::ProxyError;
use crate::middleware::ClientAddr;
use crate::stage::Endpoint;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use s3proxy_store::{ObjectMetadata, ObjectStore};
use std::sync::Arc;

/// Format used for `Last-Modified`
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Serves objects from a store, one key per request path
#[derive(Clone)]
pub struct ObjectFetchHandler {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ObjectFetchHandler {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Store key for a decoded request path
    pub fn object_key(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else {
            format!("/{}{}", self.prefix, path)
        }
    }

    /// Fetch the object for `request` and stream it back
    pub async fn fetch(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let raw_path = request.uri().path();
        let path = urlencoding::decode(raw_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());
        let key = self.object_key(&path);
        let client = request.extensions().get::<ClientAddr>().cloned();
        // Only the key is needed from here on
        drop(request);

        let object = self.store.get(&key).await.map_err(|err| {
            let client = client.as_ref().map(|c| c.0.as_str());
            if err.is_store_reported() {
                tracing::debug!(key = %key, client = ?client, error = %err, "Store refused object");
            } else {
                tracing::error!(key = %key, client = ?client, error = %err, "Failed to fetch object");
            }
            ProxyError::from(err)
        })?;

        let mut response = Body::from_stream(object.body).into_response();
        apply_metadata(response.headers_mut(), &object.metadata);
        *response.status_mut() = StatusCode::OK;

        Ok(response)
    }
}

impl std::fmt::Debug for ObjectFetchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectFetchHandler")
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl Endpoint for ObjectFetchHandler {
    async fn call(&self, request: Request<Body>) -> Response {
        match self.fetch(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}

/// Copy each present, non-empty metadata field into its response header
fn apply_metadata(headers: &mut HeaderMap, metadata: &ObjectMetadata) {
    let fields = [
        (header::CACHE_CONTROL, metadata.cache_control.clone()),
        (header::CONTENT_DISPOSITION, metadata.content_disposition.clone()),
        (header::CONTENT_ENCODING, metadata.content_encoding.clone()),
        (header::CONTENT_LANGUAGE, metadata.content_language.clone()),
        (header::CONTENT_LENGTH, metadata.content_length.map(|len| len.to_string())),
        (header::CONTENT_RANGE, metadata.content_range.clone()),
        (header::CONTENT_TYPE, metadata.content_type.clone()),
        (header::ETAG, metadata.etag.clone()),
        (header::EXPIRES, metadata.expires.clone()),
        (
            header::LAST_MODIFIED,
            metadata.last_modified.map(|t| t.format(HTTP_DATE).to_string()),
        ),
    ];

    for (name, value) in fields {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        insert(headers, name, &value);
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value = %value, "Skipping unrepresentable header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use s3proxy_store::{MemoryObjectStore, StoreError};

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_object_key() {
        let store = Arc::new(MemoryObjectStore::new());

        let plain = ObjectFetchHandler::new(store.clone(), "");
        assert_eq!(plain.object_key("/logo.png"), "/logo.png");

        let prefixed = ObjectFetchHandler::new(store, "assets");
        assert_eq!(prefixed.object_key("/logo.png"), "/assets/logo.png");
        assert_eq!(prefixed.object_key("/"), "/assets/");
    }

    #[tokio::test]
    async fn test_prefix_applied_to_store_key() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object("/assets/logo.png", "PNG", ObjectMetadata::default());
        let handler = ObjectFetchHandler::new(store.clone(), "assets");

        let response = handler.call(get("/logo.png")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.requested_keys(), vec!["/assets/logo.png"]);
        assert_eq!(body_text(response).await, "PNG");
    }

    #[tokio::test]
    async fn test_path_is_percent_decoded() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object("/my file.txt", "spaced", ObjectMetadata::default());
        let handler = ObjectFetchHandler::new(store.clone(), "");

        let response = handler.call(get("/my%20file.txt")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.requested_keys(), vec!["/my file.txt"]);
    }

    #[tokio::test]
    async fn test_metadata_maps_to_headers() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(
            "/report.pdf",
            "0123456789",
            ObjectMetadata {
                cache_control: Some("max-age=3600".to_string()),
                content_disposition: Some("attachment; filename=\"report.pdf\"".to_string()),
                content_encoding: Some("identity".to_string()),
                content_language: Some("en-GB".to_string()),
                content_length: Some(10),
                content_range: Some("bytes 0-9/10".to_string()),
                content_type: Some("application/pdf".to_string()),
                etag: Some("\"abc123\"".to_string()),
                expires: Some("Thu, 01 Dec 2033 16:00:00 GMT".to_string()),
                last_modified: Some(Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()),
            },
        );
        let handler = ObjectFetchHandler::new(store, "");

        let response = handler.call(get("/report.pdf")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=3600");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(headers[header::CONTENT_ENCODING], "identity");
        assert_eq!(headers[header::CONTENT_LANGUAGE], "en-GB");
        assert_eq!(headers[header::CONTENT_LENGTH], "10");
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-9/10");
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::ETAG], "\"abc123\"");
        assert_eq!(headers[header::EXPIRES], "Thu, 01 Dec 2033 16:00:00 GMT");
        assert_eq!(headers[header::LAST_MODIFIED], "Tue, 05 Mar 2024 07:08:09 GMT");
        assert_eq!(body_text(response).await, "0123456789");
    }

    #[tokio::test]
    async fn test_absent_fields_produce_no_headers() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(
            "/bare",
            "",
            ObjectMetadata {
                content_type: Some(String::new()),
                ..Default::default()
            },
        );
        let handler = ObjectFetchHandler::new(store, "");

        let response = handler.call(get("/bare")).await;

        assert_eq!(response.status(), StatusCode::OK);
        for name in [
            header::CACHE_CONTROL,
            header::CONTENT_DISPOSITION,
            header::CONTENT_ENCODING,
            header::CONTENT_LANGUAGE,
            header::CONTENT_RANGE,
            header::CONTENT_TYPE,
            header::ETAG,
            header::EXPIRES,
            header::LAST_MODIFIED,
        ] {
            assert!(response.headers().get(&name).is_none(), "unexpected {name}");
        }
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
    }

    #[tokio::test]
    async fn test_missing_key_is_404_with_store_text() {
        let handler = ObjectFetchHandler::new(Arc::new(MemoryObjectStore::new()), "");

        let response = handler.call(get("/nope.txt")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "NoSuchKey: The specified key does not exist."
        );
    }

    #[tokio::test]
    async fn test_store_refusals_are_401() {
        let store = Arc::new(MemoryObjectStore::new());
        store.fail_key(
            "/a",
            StoreError::NoSuchBucket("The specified bucket does not exist".to_string()),
        );
        store.fail_key("/b", StoreError::service("AccessDenied", "Access Denied"));
        let handler = ObjectFetchHandler::new(store, "");

        assert_eq!(handler.call(get("/a")).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(handler.call(get("/b")).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_transport_failure_is_500() {
        let store = Arc::new(MemoryObjectStore::new());
        store.fail_key("/a", StoreError::Transport("connection refused".to_string()));
        let handler = ObjectFetchHandler::new(store, "");

        let response = handler.call(get("/a")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_text(response).await,
            "transport error: connection refused"
        );
    }

    #[tokio::test]
    async fn test_repeated_fetches_are_identical() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put_object(
            "/page.html",
            "<h1>hi</h1>",
            ObjectMetadata {
                content_type: Some("text/html".to_string()),
                ..Default::default()
            },
        );
        let handler = ObjectFetchHandler::new(store.clone(), "");

        let first = handler.call(get("/page.html")).await;
        let second = handler.call(get("/page.html")).await;

        assert_eq!(first.headers(), second.headers());
        assert_eq!(body_text(first).await, body_text(second).await);
        assert_eq!(store.requested_keys().len(), 2);
    }
}
