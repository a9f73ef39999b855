// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session verification middleware.
//!
//! A request-scoped gate: extracts the bearer credential, validates it
//! against the access key, resolves the subject against the credential
//! store, and attaches the resulting identity to the request. It runs
//! independently on every protected call, with no session cache and no
//! sticky state between requests, and it never mutates anything.

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::auth::{cookie, AuthContext, IdentityService};
use crate::error::ApiError;

// =============================================================================
// SessionLayer
// =============================================================================

/// Layer that verifies access tokens on every non-public request.
#[derive(Clone)]
pub struct SessionLayer {
    identity: Arc<IdentityService>,
    public_paths: Arc<HashSet<String>>,
}

impl SessionLayer {
    /// Creates a new session layer.
    pub fn new(identity: Arc<IdentityService>) -> Self {
        Self {
            identity,
            public_paths: Arc::new(HashSet::new()),
        }
    }

    /// Adds public paths that don't require authentication.
    pub fn with_public_paths(mut self, paths: Vec<String>) -> Self {
        self.public_paths = Arc::new(paths.into_iter().collect());
        self
    }

    /// Creates with the default public paths.
    pub fn with_default_public_paths(self) -> Self {
        self.with_public_paths(vec![
            "/health".to_string(),
            "/ready".to_string(),
            "/api/v1/auth/register".to_string(),
            "/api/v1/auth/login".to_string(),
            "/api/v1/auth/refresh".to_string(),
        ])
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            identity: self.identity.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

// =============================================================================
// SessionMiddleware
// =============================================================================

/// Middleware that performs the per-request verification.
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    identity: Arc<IdentityService>,
    public_paths: Arc<HashSet<String>>,
}

impl<S> Service<Request<Body>> for SessionMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let identity = self.identity.clone();
        let is_public = self.public_paths.contains(req.uri().path());
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let client_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip());

            if is_public {
                let mut ctx = AuthContext::anonymous();
                if let Some(ip) = client_ip {
                    ctx = ctx.with_client_ip(ip);
                }
                req.extensions_mut().insert(ctx);
                return inner.call(req).await;
            }

            let Some(token) = extract_credential(&req) else {
                tracing::debug!("No access credential provided");
                return Ok(
                    ApiError::unauthorized("Authentication required").into_response()
                );
            };

            // Verify, then resolve against the store. Both steps run fresh
            // for this request.
            let snapshot = match identity.authenticate(&token).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::debug!(error = %e, "Access token rejected");
                    return Ok(ApiError::from(e).into_response());
                }
            };

            let account_id = snapshot.id;
            let mut ctx = AuthContext::authenticated(snapshot);
            if let Some(ip) = client_ip {
                ctx = ctx.with_client_ip(ip);
            }
            tracing::debug!(
                request_id = %ctx.request_id,
                account_id = %account_id,
                "Request authenticated"
            );
            req.extensions_mut().insert(ctx);

            inner.call(req).await
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Extracts the access credential from the request.
///
/// The cookie takes precedence over the `Authorization` header when both
/// are present.
fn extract_credential<B>(req: &Request<B>) -> Option<String> {
    if let Some(token) = cookie::cookie_value(req.headers(), cookie::ACCESS_COOKIE) {
        return Some(token);
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer ").map(|s| s.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request() -> Request<Body> {
        Request::builder().uri("/test").body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut req = request();
        assert!(extract_credential(&req).is_none());

        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_credential(&req).is_none());

        req.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer mytoken123"),
        );
        assert_eq!(extract_credential(&req), Some("mytoken123".to_string()));
    }

    #[test]
    fn test_cookie_takes_precedence_over_header() {
        let mut req = request();
        req.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        req.headers_mut().insert(
            header::COOKIE,
            HeaderValue::from_static("access_token=cookie-token"),
        );

        assert_eq!(extract_credential(&req), Some("cookie-token".to_string()));
    }
}
