// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Execution history handlers.
//!
//! Every query is scoped to the authenticated account; a record owned by
//! someone else is indistinguishable from a missing one.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use kiln_core::ExecutionId;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, History};
use crate::response::{ApiResponse, ResponseMeta};
use crate::state::AppState;

// =============================================================================
// List
// =============================================================================

/// GET /api/v1/history
///
/// Returns one page of the caller's execution history, filtered and sorted
/// per the query parameters.
pub async fn list_history(
    State(state): State<AppState>,
    Auth(identity): Auth,
    History(query): History,
) -> ApiResult<impl IntoResponse> {
    let page = state.executions.query(identity.id, &query).await?;

    Ok(ApiResponse::success(page.records)
        .with_meta(ResponseMeta::pagination(page.total, page.page, page.per_page)))
}

// =============================================================================
// Get One
// =============================================================================

/// GET /api/v1/history/{id}
///
/// Returns a single execution record owned by the caller.
pub async fn get_execution(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_execution_id(&id)?;
    let record = state.executions.find(identity.id, id).await?;

    Ok(Json(ApiResponse::success(record)))
}

// =============================================================================
// Delete One
// =============================================================================

/// DELETE /api/v1/history/{id}
///
/// Deletes a single execution record owned by the caller.
pub async fn delete_execution(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_execution_id(&id)?;
    state.executions.delete(identity.id, id).await?;

    Ok(Json(
        ApiResponse::success(serde_json::json!({}))
            .with_message("Execution record deleted"),
    ))
}

// =============================================================================
// Clear
// =============================================================================

/// DELETE /api/v1/history
///
/// Deletes the caller's entire execution history.
pub async fn clear_history(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.executions.clear(identity.id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "deleted_count": deleted
    }))))
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_execution_id(raw: &str) -> ApiResult<ExecutionId> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid execution record id"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execution_id() {
        let id = ExecutionId::new();
        assert_eq!(parse_execution_id(&id.to_string()).unwrap(), id);
        assert!(parse_execution_id("not-a-uuid").is_err());
    }
}
