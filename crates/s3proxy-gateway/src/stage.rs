//! Ordered request stages and the per-site chain they form
//!
//! A site is served by a [`SiteChain`]: a fixed list of [`Stage`]s followed
//! by an [`Endpoint`]. Each stage sees the request together with a [`Next`]
//! handle for the rest of the chain and decides whether to answer itself or
//! pass the (possibly modified) request on.

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// A request-processing step that may delegate to the rest of the chain
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name used in logs and chain inspection
    fn name(&self) -> &'static str;

    /// Handle the request, calling `next.run` to continue down the chain
    async fn handle(&self, request: Request<Body>, next: Next) -> Response;
}

/// The innermost handler of a chain
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: Request<Body>) -> Response;
}

/// The remainder of a chain, as seen from one stage
#[derive(Clone)]
pub struct Next {
    stages: Arc<[Arc<dyn Stage>]>,
    position: usize,
    endpoint: Arc<dyn Endpoint>,
}

impl Next {
    /// Run the remaining stages and the endpoint
    pub async fn run(self, request: Request<Body>) -> Response {
        let stage = self.stages.get(self.position).cloned();
        match stage {
            Some(stage) => {
                let next = Self {
                    position: self.position + 1,
                    ..self
                };
                stage.handle(request, next).await
            }
            None => self.endpoint.call(request).await,
        }
    }

    /// Expose the remainder as a tower service, so tower layers can wrap it
    pub fn into_service(self) -> NextService {
        NextService(self)
    }
}

/// [`Next`] as a `tower::Service`
#[derive(Clone)]
pub struct NextService(Next);

impl Service<Request<Body>> for NextService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let next = self.0.clone();
        Box::pin(async move { Ok(next.run(request).await) })
    }
}

/// The composed handler for one site. Immutable once built.
#[derive(Clone)]
pub struct SiteChain {
    stages: Arc<[Arc<dyn Stage>]>,
    endpoint: Arc<dyn Endpoint>,
}

impl SiteChain {
    /// Compose `stages`, outermost first, in front of `endpoint`
    pub fn new(stages: Vec<Arc<dyn Stage>>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            stages: stages.into(),
            endpoint,
        }
    }

    /// Stage names, outermost first
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run a request through the whole chain
    pub async fn handle(&self, request: Request<Body>) -> Response {
        Next {
            stages: Arc::clone(&self.stages),
            position: 0,
            endpoint: Arc::clone(&self.endpoint),
        }
        .run(request)
        .await
    }
}

impl std::fmt::Debug for SiteChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use parking_lot::Mutex;

    /// Endpoint that records the paths it saw and answers 200 "endpoint"
    #[derive(Default)]
    pub(crate) struct RecordingEndpoint {
        pub(crate) seen: Mutex<Vec<String>>,
    }

    impl RecordingEndpoint {
        pub(crate) fn paths(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl Endpoint for RecordingEndpoint {
        async fn call(&self, request: Request<Body>) -> Response {
            self.seen.lock().push(request.uri().to_string());
            (StatusCode::OK, "endpoint").into_response()
        }
    }

    /// Stage that tags the response so ordering can be observed
    struct Tag(&'static str);

    #[async_trait]
    impl Stage for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn handle(&self, request: Request<Body>, next: Next) -> Response {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .append("x-stage", HeaderValue::from_static(self.0));
            response
        }
    }

    struct Refuse;

    #[async_trait]
    impl Stage for Refuse {
        fn name(&self) -> &'static str {
            "refuse"
        }

        async fn handle(&self, _request: Request<Body>, _next: Next) -> Response {
            StatusCode::FORBIDDEN.into_response()
        }
    }

    #[tokio::test]
    async fn test_stages_run_outermost_first() {
        let endpoint = Arc::new(RecordingEndpoint::default());
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Tag("outer")), Arc::new(Tag("inner"))];
        let chain = SiteChain::new(stages, endpoint.clone());

        assert_eq!(chain.stage_names(), vec!["outer", "inner"]);

        let response = chain
            .handle(Request::get("/a").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Responses unwind innermost first
        let tags: Vec<_> = response.headers().get_all("x-stage").iter().collect();
        assert_eq!(tags, vec!["inner", "outer"]);
        assert_eq!(endpoint.paths(), vec!["/a"]);
    }

    #[tokio::test]
    async fn test_stage_can_short_circuit() {
        let endpoint = Arc::new(RecordingEndpoint::default());
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Refuse), Arc::new(Tag("never"))];
        let chain = SiteChain::new(stages, endpoint.clone());

        let response = chain
            .handle(Request::get("/a").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("x-stage").is_none());
        assert!(endpoint.paths().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_calls_endpoint() {
        let endpoint = Arc::new(RecordingEndpoint::default());
        let chain = SiteChain::new(Vec::new(), endpoint.clone());

        let response = chain
            .handle(Request::get("/only").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(endpoint.paths(), vec!["/only"]);
        assert_eq!(format!("{chain:?}"), "SiteChain { stages: [] }");
    }
}
