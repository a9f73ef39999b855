// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock implementations for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use kiln_core::{
    AnalysisOutcome, EngineError, ExecutionEngine, ExecutionRequest, RunOutcome, ScoreBreakdown,
};

// =============================================================================
// MockEngine
// =============================================================================

/// A scripted engine: answers every request with a canned outcome, or with
/// a configured failure.
pub struct MockEngine {
    failure: Option<EngineError>,
    healthy: bool,
    calls: AtomicUsize,
}

impl MockEngine {
    /// An engine that always succeeds.
    pub fn healthy() -> Self {
        Self {
            failure: None,
            healthy: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// An engine that fails every request with the given error.
    pub fn failing(failure: EngineError) -> Self {
        Self {
            failure: Some(failure),
            healthy: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns how many execute/analyze calls the engine has served.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The canned run outcome for a piece of code.
    pub fn run_outcome(code: &str) -> RunOutcome {
        RunOutcome {
            success: true,
            output: format!("ran {} bytes\n", code.len()),
            errors: Vec::new(),
            execution_time: 0.042,
            profiling: None,
            timestamp: None,
        }
    }

    /// The canned analysis outcome for a piece of code.
    pub fn analysis_outcome(code: &str) -> AnalysisOutcome {
        AnalysisOutcome {
            run: Self::run_outcome(code),
            suggestions: Vec::new(),
            optimization_score: 87.5,
            score_breakdown: ScoreBreakdown {
                severity_penalty: 2.5,
                complexity_penalty: 5.0,
                performance_penalty: 2.5,
                memory_penalty: 2.5,
            },
            complexity_class: "O(n)".to_string(),
            complexity_analysis: serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl ExecutionEngine for MockEngine {
    async fn execute(&self, request: ExecutionRequest) -> Result<RunOutcome, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(Self::run_outcome(&request.code)),
        }
    }

    async fn analyze(&self, request: ExecutionRequest) -> Result<AnalysisOutcome, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(Self::analysis_outcome(&request.code)),
        }
    }

    async fn ping(&self) -> bool {
        self.healthy
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_engine_counts_calls() {
        let engine = MockEngine::healthy();
        engine
            .execute(ExecutionRequest::new("print(1)"))
            .await
            .unwrap();
        engine
            .analyze(ExecutionRequest::new("print(1)"))
            .await
            .unwrap();

        assert_eq!(engine.call_count(), 2);
        assert!(engine.ping().await);
    }

    #[tokio::test]
    async fn test_failing_engine() {
        let engine = MockEngine::failing(EngineError::rejected("nope"));

        assert!(engine.execute(ExecutionRequest::new("x")).await.is_err());
        assert!(!engine.ping().await);
    }
}
