//! Host routing and the axum router

use crate::middleware::{self, effective_host};
use crate::stage::SiteChain;
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Virtual host table: literal host (port included) to site chain
#[derive(Clone, Debug, Default)]
pub struct HostRouter {
    hosts: HashMap<String, SiteChain>,
}

impl HostRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `chain` for `host`, replacing any earlier registration
    pub fn register_host(&mut self, host: impl Into<String>, chain: SiteChain) {
        let host = host.into();
        if self.hosts.insert(host.clone(), chain).is_some() {
            tracing::warn!(host = %host, "Host registered twice, later configuration wins");
        }
    }

    /// Registered hosts, sorted
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<_> = self.hosts.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Hand the request to its host's chain, or answer 404
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let chain = effective_host(&request).and_then(|host| self.hosts.get(host));
        match chain {
            Some(chain) => chain.handle(request).await,
            None => {
                tracing::debug!(host = ?effective_host(&request), "No site for host");
                (StatusCode::NOT_FOUND, "Not Found").into_response()
            }
        }
    }
}

/// What serves requests: one chain for everything, or a chain per host
#[derive(Clone, Debug)]
pub enum ProxyHandler {
    Single(SiteChain),
    Routed(HostRouter),
}

impl ProxyHandler {
    pub async fn handle(&self, request: Request<Body>) -> Response {
        match self {
            Self::Single(chain) => chain.handle(request).await,
            Self::Routed(router) => router.dispatch(request).await,
        }
    }
}

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(proxy_request)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every request, whatever its method or path, goes through the site handler
async fn proxy_request(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let Some(limit) = state.config.request_timeout() else {
        return state.handler.handle(request).await;
    };

    let uri = request.uri().clone();
    match tokio::time::timeout(limit, state.handler.handle(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(uri = %uri, timeout_secs = limit.as_secs(), "Request timed out");
            (StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout").into_response()
        }
    }
}
