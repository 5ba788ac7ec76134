//! Static website index documents

use crate::stage::{Next, Stage};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{uri::PathAndQuery, Request, Uri},
    response::Response,
};

/// Appends the bucket's index document suffix to directory paths
#[derive(Clone, Debug)]
pub struct WebsiteIndex {
    suffix: String,
}

impl WebsiteIndex {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The URI with the suffix appended when the path is empty or ends in `/`
    pub fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let path = uri.path();
        if !(path.is_empty() || path.ends_with('/')) {
            return None;
        }

        let mut rewritten = format!("{path}{}", self.suffix);
        if let Some(query) = uri.query() {
            rewritten.push('?');
            rewritten.push_str(query);
        }

        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(PathAndQuery::try_from(rewritten).ok()?);
        Uri::from_parts(parts).ok()
    }
}

#[async_trait]
impl Stage for WebsiteIndex {
    fn name(&self) -> &'static str {
        "website-index"
    }

    async fn handle(&self, mut request: Request<Body>, next: Next) -> Response {
        if let Some(uri) = self.rewrite(request.uri()) {
            tracing::debug!(from = %request.uri(), to = %uri, "Rewrote directory request");
            *request.uri_mut() = uri;
        }

        next.run(request).await
    }
}
