// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API surface integration tests: probes, execution proxying, engine
//! failure mapping, rate limiting, and the 404 fallback.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use kiln_core::EngineError;
use kiln_tests::prelude::*;

/// Waits for the fire-and-forget history insert to land.
async fn wait_for_records(app: &TestApp, count: usize) {
    for _ in 0..100 {
        if app.executions.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution record was not persisted");
}

async fn registered_token(app: &TestApp) -> String {
    app.register("Ada", "ada@x.com", "password123")
        .await
        .access_token()
}

// =============================================================================
// Probes
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();

    let response = app.request(Method::GET, "/health", AuthMode::None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn ready_reflects_engine_reachability() {
    let app = TestApp::new();
    let ready = app.request(Method::GET, "/ready", AuthMode::None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["ready"], true);

    let app = TestApp::with_engine(Arc::new(MockEngine::failing(EngineError::unavailable(
        "down",
    ))));
    let not_ready = app.request(Method::GET, "/ready", AuthMode::None, None).await;
    assert_eq!(not_ready.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(not_ready.body["ready"], false);
}

// =============================================================================
// Execute
// =============================================================================

#[tokio::test]
async fn execute_requires_authentication() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/api/v1/execute",
            AuthMode::None,
            Some(json!({ "code": "print(1)" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn execute_proxies_and_records() {
    let app = TestApp::new();
    let token = registered_token(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/execute",
            AuthMode::Bearer(&token),
            Some(json!({ "code": "print(1)", "timeout": 10 })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["success"], true);
    assert!(response.body["data"]["output"]
        .as_str()
        .unwrap()
        .starts_with("ran"));

    wait_for_records(&app, 1).await;
}

#[tokio::test]
async fn execute_validation_failures() {
    let app = TestApp::new();
    let token = registered_token(&app).await;

    let cases = [
        json!({ "code": "" }),
        json!({ "code": "   " }),
        json!({ "code": "x".repeat(10_001) }),
        json!({ "code": "print(1)", "timeout": 0 }),
        json!({ "code": "print(1)", "timeout": 31 }),
    ];

    for body in cases {
        let response = app
            .request(
                Method::POST,
                "/api/v1/execute",
                AuthMode::Bearer(&token),
                Some(body),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    // Nothing invalid reaches the history.
    assert_eq!(app.executions.len(), 0);
}

#[tokio::test]
async fn analyze_records_score() {
    let app = TestApp::new();
    let token = registered_token(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/analyze",
            AuthMode::Bearer(&token),
            Some(json!({ "code": "for i in range(10): pass" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["optimization_score"], 87.5);
    assert_eq!(response.body["data"]["complexity_class"], "O(n)");

    wait_for_records(&app, 1).await;
}

// =============================================================================
// Engine Failure Mapping
// =============================================================================

#[tokio::test]
async fn engine_rejection_maps_to_bad_request_with_detail() {
    let app = TestApp::with_engine(Arc::new(MockEngine::failing(EngineError::rejected(
        "syntax error on line 3",
    ))));
    let token = registered_token(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/execute",
            AuthMode::Bearer(&token),
            Some(json!({ "code": "print(" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_message(), "syntax error on line 3");
}

#[tokio::test]
async fn engine_outage_maps_to_bad_gateway_without_detail() {
    let app = TestApp::with_engine(Arc::new(MockEngine::failing(EngineError::unavailable(
        "connection refused to 10.0.0.7:8000",
    ))));
    let token = registered_token(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/execute",
            AuthMode::Bearer(&token),
            Some(json!({ "code": "print(1)" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    // Transport detail stays in the logs.
    assert_eq!(response.error_message(), "Interpreter service unavailable");

    // A failed run is not recorded.
    assert_eq!(app.executions.len(), 0);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn auth_tier_rate_limits_after_five_attempts() {
    let app = TestApp::with_config(api_config_with_rate_limits());

    for _ in 0..5 {
        let response = app.login("ada@x.com", "wrongpass").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let limited = app.login("ada@x.com", "wrongpass").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.error_code(), "RATE_LIMIT_EXCEEDED");
    assert!(limited.headers.get("Retry-After").is_some());
}

// =============================================================================
// Fallback
// =============================================================================

#[tokio::test]
async fn unknown_route_returns_structured_404() {
    let app = TestApp::new();
    let token = registered_token(&app).await;

    // Unknown routes still sit behind the session gate...
    let anonymous = app
        .request(Method::GET, "/api/v1/nope", AuthMode::None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    // ...and answer a structured 404 to authenticated callers.
    let response = app
        .request(Method::GET, "/api/v1/nope", AuthMode::Bearer(&token), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new();
    let token = registered_token(&app).await;

    // A JSON number where an object is expected.
    let response = app
        .request(
            Method::POST,
            "/api/v1/execute",
            AuthMode::Bearer(&token),
            Some(json!(42)),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
