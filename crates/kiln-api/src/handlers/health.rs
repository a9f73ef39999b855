// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::ApiError;
use crate::response::{ComponentStatus, HealthResponse, ReadinessResponse};
use crate::state::AppState;

// =============================================================================
// Health
// =============================================================================

/// GET /health
///
/// Liveness probe: answers as long as the process is serving requests.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

// =============================================================================
// Ready
// =============================================================================

/// GET /ready
///
/// Readiness probe: checks that the execution engine is reachable. Answers
/// 503 when it is not, so load balancers stop routing execution traffic at
/// a node that cannot serve it.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let engine_healthy = state.engine.ping().await;

    let response = ReadinessResponse {
        ready: engine_healthy,
        components: vec![ComponentStatus {
            name: "engine".to_string(),
            healthy: engine_healthy,
            message: (!engine_healthy).then(|| "Interpreter service unreachable".to_string()),
        }],
    };

    let status = if response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

// =============================================================================
// Fallback
// =============================================================================

/// Fallback handler for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route")
}
