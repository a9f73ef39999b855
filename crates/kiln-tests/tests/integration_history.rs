// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Execution history integration tests: pagination, search, sorting, and
//! owner scoping.

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};

use kiln_core::{AccountId, ExecutionStore};
use kiln_tests::prelude::*;

/// Registers an account and returns its bearer token and id.
async fn registered(app: &TestApp, email: &str) -> (String, AccountId) {
    let response = app.register("Ada", email, "password123").await;
    assert_eq!(response.status, StatusCode::CREATED);

    let id = response.body["data"]["user"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    (response.access_token(), id)
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn list_paginates_with_defaults() {
    let app = TestApp::new();
    let (token, account) = registered(&app, "ada@x.com").await;

    for i in 0..25 {
        let mut record = execution_record(account, &format!("print({})", i));
        record.created_at = Utc::now() - Duration::seconds(25 - i);
        app.executions.insert(record).await.unwrap();
    }

    let first = app
        .request(Method::GET, "/api/v1/history", AuthMode::Bearer(&token), None)
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["meta"]["total"], 25);
    assert_eq!(first.body["meta"]["total_pages"], 2);
    assert_eq!(first.body["data"].as_array().unwrap().len(), 20);

    // Newest first by default.
    assert_eq!(first.body["data"][0]["code"], "print(24)");

    let second = app
        .request(
            Method::GET,
            "/api/v1/history?page=2",
            AuthMode::Bearer(&token),
            None,
        )
        .await;
    assert_eq!(second.body["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn list_rejects_out_of_range_parameters() {
    let app = TestApp::new();
    let (token, _) = registered(&app, "ada@x.com").await;

    for uri in [
        "/api/v1/history?page=0",
        "/api/v1/history?per_page=0",
        "/api/v1/history?per_page=51",
    ] {
        let response = app
            .request(Method::GET, uri, AuthMode::Bearer(&token), None)
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

// =============================================================================
// Search and Sorting
// =============================================================================

#[tokio::test]
async fn list_filters_by_code_substring() {
    let app = TestApp::new();
    let (token, account) = registered(&app, "ada@x.com").await;

    app.executions
        .insert(execution_record(account, "fibonacci(30)"))
        .await
        .unwrap();
    app.executions
        .insert(execution_record(account, "print('hello')"))
        .await
        .unwrap();

    let response = app
        .request(
            Method::GET,
            "/api/v1/history?search=FIB",
            AuthMode::Bearer(&token),
            None,
        )
        .await;

    assert_eq!(response.body["meta"]["total"], 1);
    assert_eq!(response.body["data"][0]["code"], "fibonacci(30)");
}

#[tokio::test]
async fn list_sorts_by_requested_field() {
    let app = TestApp::new();
    let (token, account) = registered(&app, "ada@x.com").await;

    let mut slow = execution_record(account, "slow()");
    slow.execution_time = 2.5;
    let mut fast = execution_record(account, "fast()");
    fast.execution_time = 0.1;
    app.executions.insert(slow).await.unwrap();
    app.executions.insert(fast).await.unwrap();

    let asc = app
        .request(
            Method::GET,
            "/api/v1/history?sort_by=execution_time&order=asc",
            AuthMode::Bearer(&token),
            None,
        )
        .await;
    assert_eq!(asc.body["data"][0]["code"], "fast()");

    let desc = app
        .request(
            Method::GET,
            "/api/v1/history?sort_by=execution_time&order=desc",
            AuthMode::Bearer(&token),
            None,
        )
        .await;
    assert_eq!(desc.body["data"][0]["code"], "slow()");
}

#[tokio::test]
async fn list_sorts_by_optimization_score() {
    let app = TestApp::new();
    let (token, account) = registered(&app, "ada@x.com").await;

    app.executions
        .insert(analysis_record(account, "good()", 95.0))
        .await
        .unwrap();
    app.executions
        .insert(analysis_record(account, "poor()", 40.0))
        .await
        .unwrap();
    app.executions
        .insert(execution_record(account, "unscored()"))
        .await
        .unwrap();

    let response = app
        .request(
            Method::GET,
            "/api/v1/history?sort_by=optimization_score&order=desc",
            AuthMode::Bearer(&token),
            None,
        )
        .await;

    assert_eq!(response.body["data"][0]["code"], "good()");
    assert_eq!(response.body["data"][1]["code"], "poor()");
    // Unscored records sort last in descending order.
    assert_eq!(response.body["data"][2]["code"], "unscored()");
}

// =============================================================================
// Owner Scoping
// =============================================================================

#[tokio::test]
async fn records_are_invisible_across_accounts() {
    let app = TestApp::new();
    let (ada_token, ada) = registered(&app, "ada@x.com").await;
    let (eve_token, _) = registered(&app, "eve@x.com").await;

    let record = execution_record(ada, "secret()");
    let id = record.id.to_string();
    app.executions.insert(record).await.unwrap();

    // The owner reads it.
    let owner = app
        .request(
            Method::GET,
            &format!("/api/v1/history/{}", id),
            AuthMode::Bearer(&ada_token),
            None,
        )
        .await;
    assert_eq!(owner.status, StatusCode::OK);
    assert_eq!(owner.body["data"]["code"], "secret()");

    // Anyone else sees a 404; existence is not revealed.
    let other = app
        .request(
            Method::GET,
            &format!("/api/v1/history/{}", id),
            AuthMode::Bearer(&eve_token),
            None,
        )
        .await;
    assert_eq!(other.status, StatusCode::NOT_FOUND);

    // Same for deletes; the record survives the attempt.
    let delete = app
        .request(
            Method::DELETE,
            &format!("/api/v1/history/{}", id),
            AuthMode::Bearer(&eve_token),
            None,
        )
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
    assert_eq!(app.executions.len(), 1);
}

#[tokio::test]
async fn delete_and_clear() {
    let app = TestApp::new();
    let (token, account) = registered(&app, "ada@x.com").await;

    let record = execution_record(account, "a()");
    let id = record.id.to_string();
    app.executions.insert(record).await.unwrap();
    app.executions
        .insert(execution_record(account, "b()"))
        .await
        .unwrap();

    let delete = app
        .request(
            Method::DELETE,
            &format!("/api/v1/history/{}", id),
            AuthMode::Bearer(&token),
            None,
        )
        .await;
    assert_eq!(delete.status, StatusCode::OK);

    // Deleting again is a 404.
    let again = app
        .request(
            Method::DELETE,
            &format!("/api/v1/history/{}", id),
            AuthMode::Bearer(&token),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let clear = app
        .request(Method::DELETE, "/api/v1/history", AuthMode::Bearer(&token), None)
        .await;
    assert_eq!(clear.status, StatusCode::OK);
    assert_eq!(clear.body["data"]["deleted_count"], 1);
    assert_eq!(app.executions.len(), 0);
}

#[tokio::test]
async fn malformed_record_id_is_a_bad_request() {
    let app = TestApp::new();
    let (token, _) = registered(&app, "ada@x.com").await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/history/not-a-uuid",
            AuthMode::Bearer(&token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
