//! HTTP Basic authentication

use super::effective_host;
use crate::config::Credential;
use crate::stage::{Next, Stage};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

/// Basic authentication against a fixed user list.
///
/// A missing header, an unknown user and a wrong password all produce the
/// same challenge.
#[derive(Clone)]
pub struct BasicAuth {
    users: HashMap<String, String>,
}

impl BasicAuth {
    /// Build the lookup map; later duplicates of a name win
    pub fn new(users: &[Credential]) -> Self {
        let users = users
            .iter()
            .map(|user| (user.name.clone(), user.password.clone()))
            .collect();
        Self { users }
    }

    /// Number of distinct users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check the request's Basic credentials
    pub fn verify<B>(&self, request: &Request<B>) -> bool {
        let Some(credentials) = request.headers().typed_get::<Authorization<Basic>>() else {
            return false;
        };

        self.users
            .get(credentials.username())
            .is_some_and(|expected| {
                bool::from(expected.as_bytes().ct_eq(credentials.password().as_bytes()))
            })
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl Stage for BasicAuth {
    fn name(&self) -> &'static str {
        "basic-auth"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        if !self.verify(&request) {
            let host = effective_host(&request).unwrap_or_default();
            tracing::debug!(host = %host, uri = %request.uri(), "Rejected request without valid credentials");
            return challenge(host);
        }

        next.run(request).await
    }
}

/// 401 with a Basic challenge for `realm` and an empty body
pub fn challenge(realm: &str) -> Response {
    let value = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic"));

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, value)],
    )
        .into_response()
}
