//! CORS for read-only access

use crate::stage::{Next, Stage};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
};
use tower::{Layer, ServiceExt};
use tower_http::cors::{Any, CorsLayer};

/// Any origin, any header, HEAD/GET/OPTIONS only.
///
/// OPTIONS requests are answered here and never reach the store.
#[derive(Clone, Debug)]
pub struct Cors {
    layer: CorsLayer,
}

impl Cors {
    pub fn new() -> Self {
        Self {
            layer: CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::HEAD, Method::GET, Method::OPTIONS]),
        }
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        match self.layer.layer(next.into_service()).oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}
