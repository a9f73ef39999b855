// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Contract for the remote interpreter/analysis engine.
//!
//! The engine is an external collaborator with its own failure modes; the
//! backend proxies to it and performs exactly one attempt per request. The
//! HTTP implementation lives in the `kiln-engine` crate.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AccountId;

// =============================================================================
// ExecutionRequest
// =============================================================================

/// A request to run or analyze a piece of source code.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    /// Source code to run.
    pub code: String,
    /// Execution timeout in seconds (1–30).
    pub timeout: u32,
    /// The requesting account, forwarded for engine-side accounting.
    #[serde(rename = "user_id", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
}

impl ExecutionRequest {
    /// Default execution timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u32 = 5;

    /// Maximum allowed execution timeout in seconds.
    pub const MAX_TIMEOUT_SECS: u32 = 30;

    /// Maximum allowed source length in characters.
    pub const MAX_CODE_LEN: usize = 10_000;

    /// Creates a request with the default timeout.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            timeout: Self::DEFAULT_TIMEOUT_SECS,
            account_id: None,
        }
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the requesting account.
    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

// =============================================================================
// Outcome Types
// =============================================================================

/// Per-line profiling statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineStats {
    /// Number of times the line executed.
    pub count: u64,
    /// Total time spent on the line, in milliseconds.
    pub total_time: f64,
    /// Average time per execution, in milliseconds.
    pub avg_time: f64,
    /// Memory attributed to the line, in bytes.
    pub memory: f64,
}

/// Per-function profiling statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionStats {
    /// Number of calls.
    pub calls: u64,
    /// Total time spent in the function, in milliseconds.
    pub total_time: f64,
    /// Average time per call, in milliseconds.
    pub avg_time: f64,
    /// Maximum recursion depth observed.
    pub max_depth: u32,
}

/// Profiling data attached to an execution outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilingData {
    /// Statistics keyed by line number.
    pub line_stats: HashMap<String, LineStats>,
    /// Statistics keyed by function name.
    pub function_stats: HashMap<String, FunctionStats>,
    /// Total profiled time in milliseconds.
    pub total_time_ms: f64,
    /// Total lines in the program.
    pub total_lines: u32,
    /// Lines that were actually profiled.
    pub lines_profiled: u32,
}

/// Result of a plain execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Whether the program ran to completion.
    pub success: bool,
    /// Captured stdout.
    pub output: String,
    /// Errors reported by the engine.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Wall-clock execution time in seconds.
    pub execution_time: f64,
    /// Optional profiling data.
    #[serde(default)]
    pub profiling: Option<ProfilingData>,
    /// Engine-side timestamp of the run.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Breakdown of the optimization score penalties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Penalty from issue severity.
    pub severity_penalty: f64,
    /// Penalty from algorithmic complexity.
    pub complexity_penalty: f64,
    /// Penalty from runtime performance.
    pub performance_penalty: f64,
    /// Penalty from memory behavior.
    pub memory_penalty: f64,
}

/// Result of an analysis run: an execution plus optimization findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// The underlying execution result.
    #[serde(flatten)]
    pub run: RunOutcome,
    /// Optimization suggestions, schema owned by the engine.
    #[serde(default)]
    pub suggestions: Vec<serde_json::Value>,
    /// Optimization score, 0–100.
    pub optimization_score: f64,
    /// Penalty breakdown behind the score.
    pub score_breakdown: ScoreBreakdown,
    /// Complexity class label (e.g. "O(n log n)").
    pub complexity_class: String,
    /// Raw complexity analysis, schema owned by the engine.
    #[serde(default)]
    pub complexity_analysis: serde_json::Value,
}

// =============================================================================
// EngineError
// =============================================================================

/// Failure modes of the remote engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine rejected the submitted code (HTTP 422). Caller's fault.
    #[error("Engine rejected input: {detail}")]
    Rejected {
        /// The engine's rejection detail.
        detail: String,
    },

    /// The engine could not be reached or answered with a server error.
    #[error("Engine unavailable: {message}")]
    Unavailable {
        /// Operator-facing detail.
        message: String,
    },

    /// The request exceeded the client-side deadline.
    #[error("Engine timed out after {limit:?}")]
    Timeout {
        /// The deadline that was exceeded.
        limit: Duration,
    },

    /// The engine answered with something the client could not decode.
    #[error("Engine protocol error: {message}")]
    Protocol {
        /// Operator-facing detail.
        message: String,
    },
}

impl EngineError {
    /// Creates a rejection error.
    pub fn rejected(detail: impl Into<String>) -> Self {
        Self::Rejected {
            detail: detail.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns `true` if a later identical request might succeed.
    ///
    /// Informational only; the backend never retries on the caller's
    /// behalf.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Unavailable { .. } | EngineError::Timeout { .. }
        )
    }
}

// =============================================================================
// ExecutionEngine
// =============================================================================

/// The contract every engine client implements.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Runs code and returns its output.
    async fn execute(&self, request: ExecutionRequest) -> Result<RunOutcome, EngineError>;

    /// Runs code through the optimization analysis pipeline.
    async fn analyze(&self, request: ExecutionRequest) -> Result<AnalysisOutcome, EngineError>;

    /// Checks whether the engine is reachable. Used by readiness probes.
    async fn ping(&self) -> bool;
}

// =============================================================================
// Tests
// =============================================================================
