//! Shared-token authentication.
//!
//! Every route except the probes in [`EXEMPT_PATHS`] requires the cluster
//! token, as `Authorization: Bearer <token>` or `X-API-Key: <token>`.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::warn;

use crate::domain::ApiError;

/// Routes served without credentials.
pub const EXEMPT_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Token policy for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Required token (None = open gateway)
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthConfig {
    /// Whether `headers` carry an acceptable token.
    fn admits(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.api_key else {
            return true;
        };
        presented_token(headers).is_some_and(|token| constant_time_compare(token, expected))
    }
}

/// Token from `Authorization: Bearer` or, failing that, `X-API-Key`.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer.or_else(|| headers.get("x-api-key").and_then(|v| v.to_str().ok()))
}

/// Tower layer applying [`AuthConfig`] to every route it wraps.
#[derive(Clone, Debug)]
pub struct AuthLayer {
    config: Arc<AuthConfig>,
}

impl AuthLayer {
    /// Layer enforcing `config`.
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = RequireToken<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireToken {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service produced by [`AuthLayer`].
#[derive(Clone, Debug)]
pub struct RequireToken<S> {
    inner: S,
    config: Arc<AuthConfig>,
}

impl<S> Service<Request<Body>> for RequireToken<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let path = req.uri().path();
        if !EXEMPT_PATHS.contains(&path) && !self.config.admits(req.headers()) {
            warn!(path, "[ql-04] request rejected: missing or invalid token");
            return Box::pin(async { Ok(unauthorized()) });
        }

        // Swap in the clone so the instance polled ready is the one called.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

/// Constant-time string comparison.
///
/// Both inputs are padded to a common length with different fill bytes,
/// so neither content nor length leaks through timing.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let len = a.len().max(b.len());
    let mut left = vec![0x00u8; len];
    let mut right = vec![0xFFu8; len];
    left[..a.len()].copy_from_slice(a.as_bytes());
    right[..b.len()].copy_from_slice(b.as_bytes());

    (a.len().ct_eq(&b.len()) & left.ct_eq(&right)).into()
}

fn unauthorized() -> Response {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "error": ApiError::unauthorized("missing or invalid token"),
        "id": null
    });
    let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}
