// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Drives the real router in process, request by request, with no sockets.
//! Requests pass through the full middleware stack, so what the tests
//! exercise is exactly what production serves.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use kiln_api::{ApiConfig, ApiServer, AppState};
use kiln_core::{ExecutionEngine, MemoryCredentialStore, MemoryExecutionStore};

use super::fixtures;
use super::mocks::MockEngine;

// =============================================================================
// TestApp
// =============================================================================

/// An in-process instance of the full application.
///
/// The router is built once and cloned per request, so layer state (the
/// rate limiter buckets in particular) persists across requests the way it
/// does in a running server.
pub struct TestApp {
    /// The shared application state.
    pub state: AppState,
    /// Typed handle to the execution store for seeding and inspection.
    pub executions: Arc<MemoryExecutionStore>,
    router: Router,
}

impl TestApp {
    /// Creates an app with the default test configuration and a healthy
    /// mock engine.
    pub fn new() -> Self {
        Self::with_config_and_engine(fixtures::api_config(), Arc::new(MockEngine::healthy()))
    }

    /// Creates an app with a custom engine.
    pub fn with_engine(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self::with_config_and_engine(fixtures::api_config(), engine)
    }

    /// Creates an app with a custom configuration.
    pub fn with_config(config: ApiConfig) -> Self {
        Self::with_config_and_engine(config, Arc::new(MockEngine::healthy()))
    }

    /// Creates an app with a custom configuration and engine.
    pub fn with_config_and_engine(config: ApiConfig, engine: Arc<dyn ExecutionEngine>) -> Self {
        let executions = Arc::new(MemoryExecutionStore::new());

        let state = AppState::builder()
            .config(config)
            .credential_store(Arc::new(MemoryCredentialStore::new()))
            .execution_store(executions.clone())
            .engine(engine)
            .build()
            .expect("test app state must build");

        let router = ApiServer::new(state.clone()).router();

        Self {
            state,
            executions,
            router,
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Sends one request through the full middleware stack.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        auth: AuthMode<'_>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);

        match auth {
            AuthMode::None => {}
            AuthMode::Bearer(token) => {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            AuthMode::Cookie(pairs) => {
                let cookie = pairs
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<_>>()
                    .join("; ");
                builder = builder.header(header::COOKIE, cookie);
            }
        }

        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers an account.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/register",
            AuthMode::None,
            Some(json!({ "name": name, "email": email, "password": password })),
        )
        .await
    }

    /// Logs in.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/login",
            AuthMode::None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Rotates the token pair using the refresh cookie.
    pub async fn refresh_with_cookie(&self, refresh_token: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/refresh",
            AuthMode::Cookie(&[("refresh_token", refresh_token)]),
            None,
        )
        .await
    }

    /// Rotates the token pair using a JSON body.
    pub async fn refresh_with_body(&self, refresh_token: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/v1/auth/refresh",
            AuthMode::None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// AuthMode
// =============================================================================

/// How a test request authenticates itself.
pub enum AuthMode<'a> {
    /// No credential.
    None,
    /// `Authorization: Bearer` header.
    Bearer(&'a str),
    /// Cookie pairs.
    Cookie(&'a [(&'a str, &'a str)]),
}

// =============================================================================
// TestResponse
// =============================================================================

/// A fully-read response.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Parsed JSON body, `Null` if the body was not JSON.
    pub body: Value,
}

impl TestResponse {
    /// Returns the value of a `Set-Cookie` cookie, if the response set one.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookie_header(name).and_then(|raw| {
            let pair = raw.split(';').next()?;
            let (_, value) = pair.split_once('=')?;
            (!value.is_empty()).then(|| value.to_string())
        })
    }

    /// Returns the full `Set-Cookie` header for a cookie name.
    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(&format!("{}=", name)))
            .map(|value| value.to_string())
    }

    /// Returns the access token echoed in the body.
    pub fn access_token(&self) -> String {
        self.body["data"]["token"]
            .as_str()
            .expect("response carries an access token")
            .to_string()
    }

    /// Returns the error code from the error envelope.
    pub fn error_code(&self) -> String {
        self.body["error"]["code"]
            .as_str()
            .expect("response carries an error code")
            .to_string()
    }

    /// Returns the error message from the error envelope.
    pub fn error_message(&self) -> String {
        self.body["error"]["message"]
            .as_str()
            .expect("response carries an error message")
            .to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_smoke() {
        let app = TestApp::new();
        let response = app
            .request(Method::GET, "/health", AuthMode::None, None)
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "ok");
    }
}
