// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The reqwest-backed engine client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use kiln_core::{AnalysisOutcome, EngineError, ExecutionEngine, ExecutionRequest, RunOutcome};

// =============================================================================
// EngineConfig
// =============================================================================

/// Configuration for the engine client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the interpreter service.
    pub base_url: String,
    /// Client-side deadline for a single request.
    ///
    /// Must exceed the largest execution timeout the API accepts, so the
    /// engine's own timeout fires first and produces a structured result.
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(35),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// =============================================================================
// HttpEngine
// =============================================================================

/// HTTP client for the interpreter service.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    config: EngineConfig,
    client: reqwest::Client,
}

/// Error body shape of the interpreter service.
#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    detail: Option<String>,
}

impl HttpEngine {
    /// Creates a new client.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EngineError::unavailable(format!("failed to build client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        request: &ExecutionRequest,
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();

        if status.as_u16() == 422 {
            let detail = response
                .json::<EngineErrorBody>()
                .await
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or_else(|| "Code rejected by the interpreter".to_string());
            return Err(EngineError::rejected(detail));
        }

        if !status.is_success() {
            tracing::warn!(status = %status, path, "Engine returned an error status");
            return Err(EngineError::unavailable(format!(
                "engine answered {}",
                status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::protocol(format!("undecodable response: {}", e)))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout {
                limit: self.config.request_timeout,
            }
        } else {
            EngineError::unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl ExecutionEngine for HttpEngine {
    async fn execute(&self, request: ExecutionRequest) -> Result<RunOutcome, EngineError> {
        self.post("/execute", &request).await
    }

    async fn analyze(&self, request: ExecutionRequest) -> Result<AnalysisOutcome, EngineError> {
        self.post("/analyze", &request).await
    }

    async fn ping(&self) -> bool {
        let url = self.endpoint("/health");
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Engine ping failed");
                false
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
