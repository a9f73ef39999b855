// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Code execution and analysis handlers.
//!
//! Thin proxies to the remote engine. The engine's answer is returned to
//! the caller as-is; persisting the history record happens off the request
//! path, and a failed insert is logged rather than surfaced.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;

use kiln_core::{
    AccountId, AnalysisOutcome, ExecutionId, ExecutionRecord, ExecutionRequest, RunOutcome,
};

use crate::error::{ApiResult, ValidationErrors};
use crate::extractors::{Auth, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Execution request body.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Source code to run.
    pub code: String,
    /// Execution timeout in seconds (1–30, default 5).
    #[serde(default)]
    pub timeout: Option<u32>,
}

impl ExecuteRequest {
    /// Validates the request and returns the effective timeout.
    fn validate(&self) -> ApiResult<u32> {
        let mut errors = ValidationErrors::new();

        if self.code.trim().is_empty() {
            errors.add("code", "Code is required");
        } else if self.code.chars().count() > ExecutionRequest::MAX_CODE_LEN {
            errors.add("code", "Code cannot exceed 10,000 characters");
        }

        let timeout = self.timeout.unwrap_or(ExecutionRequest::DEFAULT_TIMEOUT_SECS);
        if timeout < 1 || timeout > ExecutionRequest::MAX_TIMEOUT_SECS {
            errors.add("timeout", "Timeout must be between 1 and 30 seconds");
        }

        errors.into_result()?;
        Ok(timeout)
    }
}

// =============================================================================
// Execute
// =============================================================================

/// POST /api/v1/execute
///
/// Runs code through the engine and records the outcome in the caller's
/// history.
pub async fn execute(
    State(state): State<AppState>,
    Auth(identity): Auth,
    ValidatedJson(request): ValidatedJson<ExecuteRequest>,
) -> ApiResult<impl IntoResponse> {
    let timeout = request.validate()?;

    let engine_request = ExecutionRequest::new(request.code.clone())
        .with_timeout(timeout)
        .with_account(identity.id);

    let outcome = state.engine.execute(engine_request).await?;

    record_execution(&state, identity.id, request.code, &outcome, None, None);

    Ok(Json(ApiResponse::success(outcome)))
}

// =============================================================================
// Analyze
// =============================================================================

/// POST /api/v1/analyze
///
/// Runs code through the engine's optimization analysis pipeline and
/// records the outcome, including its score, in the caller's history.
pub async fn analyze(
    State(state): State<AppState>,
    Auth(identity): Auth,
    ValidatedJson(request): ValidatedJson<ExecuteRequest>,
) -> ApiResult<impl IntoResponse> {
    let timeout = request.validate()?;

    let engine_request = ExecutionRequest::new(request.code.clone())
        .with_timeout(timeout)
        .with_account(identity.id);

    let outcome: AnalysisOutcome = state.engine.analyze(engine_request).await?;

    record_execution(
        &state,
        identity.id,
        request.code,
        &outcome.run,
        Some(outcome.optimization_score),
        Some(outcome.complexity_class.clone()),
    );

    Ok(Json(ApiResponse::success(outcome)))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Persists the history record off the request path.
///
/// The caller already has their result; a store failure here only loses a
/// history entry, so it is logged and swallowed.
fn record_execution(
    state: &AppState,
    account_id: AccountId,
    code: String,
    outcome: &RunOutcome,
    optimization_score: Option<f64>,
    complexity_class: Option<String>,
) {
    let record = ExecutionRecord {
        id: ExecutionId::new(),
        account_id,
        code,
        output: outcome.output.clone(),
        errors: outcome.errors.clone(),
        execution_time: outcome.execution_time,
        optimization_score,
        complexity_class,
        created_at: Utc::now(),
    };

    let store = state.executions.clone();
    tokio::spawn(async move {
        if let Err(e) = store.insert(record).await {
            tracing::error!(error = %e, "Failed to save execution record");
        }
    });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults_timeout() {
        let request = ExecuteRequest {
            code: "print(1)".to_string(),
            timeout: None,
        };
        assert_eq!(request.validate().unwrap(), 5);
    }

    #[test]
    fn test_validate_rejects_empty_code() {
        let request = ExecuteRequest {
            code: "   ".to_string(),
            timeout: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_code() {
        let request = ExecuteRequest {
            code: "x".repeat(10_001),
            timeout: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let request = ExecuteRequest {
            code: "print(1)".to_string(),
            timeout: Some(31),
        };
        assert!(request.validate().is_err());

        let request = ExecuteRequest {
            code: "print(1)".to_string(),
            timeout: Some(0),
        };
        assert!(request.validate().is_err());

        let request = ExecuteRequest {
            code: "print(1)".to_string(),
            timeout: Some(30),
        };
        assert_eq!(request.validate().unwrap(), 30);
    }
}
