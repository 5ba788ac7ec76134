//! Request stages for site chains, plus router-level middleware

pub mod auth;
pub mod compression;
pub mod cors;
pub mod proxy_headers;
pub mod ssl;
pub mod website;

pub use auth::BasicAuth;
pub use compression::Gzip;
pub use cors::Cors;
pub use proxy_headers::{ClientAddr, ProxyHeaders};
pub use ssl::ForceHttps;
pub use website::WebsiteIndex;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Host used for routing and auth realms: the `Host` header when present,
/// else the authority of the request URI.
pub fn effective_host<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
}

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let host = effective_host(&request).unwrap_or_default().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        host = %host,
        peer = %peer,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}
