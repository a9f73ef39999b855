// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use kiln_core::{
    CredentialStore, ExecutionEngine, ExecutionStore, MemoryCredentialStore, MemoryExecutionStore,
};

use crate::auth::{IdentityService, TokenManager};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// The identity authority.
    pub identity: Arc<IdentityService>,
    /// Execution history store.
    pub executions: Arc<dyn ExecutionStore>,
    /// The remote execution engine.
    pub engine: Arc<dyn ExecutionEngine>,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Returns the identity authority.
    pub fn identity(&self) -> &Arc<IdentityService> {
        &self.identity
    }

    /// Returns the token manager.
    pub fn tokens(&self) -> &TokenManager {
        self.identity.tokens()
    }

    /// Returns the execution store.
    pub fn executions(&self) -> &Arc<dyn ExecutionStore> {
        &self.executions
    }

    /// Returns the execution engine.
    pub fn engine(&self) -> &Arc<dyn ExecutionEngine> {
        &self.engine
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing [`AppState`].
pub struct AppStateBuilder {
    config: Option<ApiConfig>,
    credentials: Option<Arc<dyn CredentialStore>>,
    executions: Option<Arc<dyn ExecutionStore>>,
    engine: Option<Arc<dyn ExecutionEngine>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            credentials: None,
            executions: None,
            engine: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the credential store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Sets the execution store.
    pub fn execution_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.executions = Some(store);
        self
    }

    /// Sets the execution engine.
    pub fn engine(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Builds the state.
    ///
    /// The stores default to the in-memory implementations; the engine has
    /// no sensible default and must be provided.
    pub fn build(self) -> ApiResult<AppState> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let tokens = TokenManager::new(config.tokens.clone())?;

        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        let executions = self
            .executions
            .unwrap_or_else(|| Arc::new(MemoryExecutionStore::new()));
        let engine = self
            .engine
            .ok_or_else(|| ApiError::internal("An execution engine is required"))?;

        let identity = Arc::new(IdentityService::new(credentials, tokens));

        Ok(AppState {
            config: Arc::new(config),
            identity,
            executions,
            engine,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiln_core::{
        AnalysisOutcome, EngineError, ExecutionRequest, RunOutcome,
    };

    use crate::auth::TokenConfig;

    struct OfflineEngine;

    #[async_trait]
    impl ExecutionEngine for OfflineEngine {
        async fn execute(&self, _: ExecutionRequest) -> Result<RunOutcome, EngineError> {
            Err(EngineError::unavailable("offline"))
        }

        async fn analyze(&self, _: ExecutionRequest) -> Result<AnalysisOutcome, EngineError> {
            Err(EngineError::unavailable("offline"))
        }

        async fn ping(&self) -> bool {
            false
        }
    }

    fn test_config() -> ApiConfig {
        ApiConfig::default().with_tokens(TokenConfig::new(
            "access-secret-long-enough-for-testing-purposes",
            "refresh-secret-long-enough-for-testing-purposes",
        ))
    }

    #[test]
    fn test_builder_requires_engine() {
        let result = AppState::builder().config(test_config()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_with_engine() {
        let state = AppState::builder()
            .config(test_config())
            .engine(Arc::new(OfflineEngine))
            .build()
            .unwrap();

        assert_eq!(state.config.port, 5000);
    }

    #[test]
    fn test_builder_rejects_bad_token_config() {
        let config = ApiConfig::default(); // empty secrets
        let result = AppState::builder()
            .config(config)
            .engine(Arc::new(OfflineEngine))
            .build();
        assert!(result.is_err());
    }
}
