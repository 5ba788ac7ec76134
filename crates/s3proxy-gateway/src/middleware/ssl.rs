//! Redirect plain HTTP to HTTPS

use super::effective_host;
use crate::stage::{Next, Stage};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Redirect, Response},
};

/// Answers every non-https request with a 307 to the https URL
#[derive(Clone, Copy, Debug, Default)]
pub struct ForceHttps;

/// `https://<host><path>[?<query>]` for the request
pub fn https_location<B>(request: &Request<B>) -> String {
    let host = effective_host(request).unwrap_or_default();
    let mut location = format!("https://{host}{}", request.uri().path());
    if let Some(query) = request.uri().query().filter(|q| !q.is_empty()) {
        location.push('?');
        location.push_str(query);
    }
    location
}

#[async_trait]
impl Stage for ForceHttps {
    fn name(&self) -> &'static str {
        "force-https"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        if request.uri().scheme_str() == Some("https") {
            return next.run(request).await;
        }

        Redirect::temporary(&https_location(&request)).into_response()
    }
}
