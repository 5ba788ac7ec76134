//! Trust forwarding headers set by a fronting proxy or load balancer

use super::effective_host;
use crate::stage::{Next, Stage};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header,
        uri::{PathAndQuery, Scheme},
        HeaderMap, HeaderName, HeaderValue, Request, Uri,
    },
    response::Response,
};

static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
static X_FORWARDED_SCHEME: HeaderName = HeaderName::from_static("x-forwarded-scheme");
static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Originating client address as reported by the proxy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// Rewrites host, scheme and client address from proxy headers.
///
/// The request URI is made absolute (`scheme://host/path`) so later stages
/// can read the scheme the client actually used.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProxyHeaders;

impl ProxyHeaders {
    fn apply<B>(request: &mut Request<B>) {
        if let Some(host) = header_str(request.headers(), &X_FORWARDED_HOST)
            .and_then(|h| HeaderValue::from_str(h).ok())
        {
            request.headers_mut().insert(header::HOST, host);
        }

        if let Some(addr) = client_addr(request.headers()) {
            request.extensions_mut().insert(ClientAddr(addr));
        }

        let Some(scheme) = forwarded_scheme(request.headers()) else {
            return;
        };
        let Some(host) = effective_host(request).map(str::to_owned) else {
            return;
        };

        let mut parts = request.uri().clone().into_parts();
        parts.scheme = Some(scheme);
        parts.authority = host.parse().ok();
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        match Uri::from_parts(parts) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(err) => tracing::debug!(host = %host, error = %err, "Ignoring unusable forwarded host"),
        }
    }
}

#[async_trait]
impl Stage for ProxyHeaders {
    fn name(&self) -> &'static str {
        "proxy-headers"
    }

    async fn handle(&self, mut request: Request<Body>, next: Next) -> Response {
        Self::apply(&mut request);
        next.run(request).await
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Value of `name` in the first element of a `Forwarded` header
fn forwarded_param<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let first = header_str(headers, &header::FORWARDED)?.split(',').next()?;
    first.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    })
}

fn forwarded_scheme(headers: &HeaderMap) -> Option<Scheme> {
    let scheme = header_str(headers, &X_FORWARDED_PROTO)
        .or_else(|| header_str(headers, &X_FORWARDED_SCHEME))
        .or_else(|| forwarded_param(headers, "proto"))?;

    match scheme.to_ascii_lowercase().as_str() {
        "https" => Some(Scheme::HTTPS),
        "http" => Some(Scheme::HTTP),
        _ => None,
    }
}

fn client_addr(headers: &HeaderMap) -> Option<String> {
    header_str(headers, &X_FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(headers, &X_REAL_IP))
        .or_else(|| forwarded_param(headers, "for"))
        .map(str::to_owned)
}
