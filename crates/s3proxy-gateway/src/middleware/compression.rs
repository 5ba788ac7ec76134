//! Gzip response compression

use crate::stage::{Next, Stage};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Extensions, HeaderMap, Request, StatusCode, Version},
    response::Response,
};
use tower::{Layer, ServiceExt};
use tower_http::compression::CompressionLayer;

type CompressWhen = fn(StatusCode, Version, &HeaderMap, &Extensions) -> bool;

/// Anything not already encoded, whatever its size or type
fn not_encoded(_: StatusCode, _: Version, headers: &HeaderMap, _: &Extensions) -> bool {
    !headers.contains_key(header::CONTENT_ENCODING)
}

/// Gzip the response when the client accepts it.
///
/// Responses that already carry `Content-Encoding` (objects stored
/// pre-compressed) are left untouched.
#[derive(Clone)]
pub struct Gzip {
    layer: CompressionLayer<CompressWhen>,
}

impl Gzip {
    pub fn new() -> Self {
        Self {
            layer: CompressionLayer::new()
                .no_br()
                .no_deflate()
                .no_zstd()
                .compress_when(not_encoded as CompressWhen),
        }
    }
}

impl Default for Gzip {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Gzip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Gzip")
    }
}

#[async_trait]
impl Stage for Gzip {
    fn name(&self) -> &'static str {
        "gzip"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        match self.layer.layer(next.into_service()).oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}
