// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! This module wires all components together:
//!
//! - Configuration loading and validation
//! - Store and engine client construction
//! - API server with the security middleware stack
//! - Graceful shutdown coordination

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use kiln_api::{ApiConfig, ApiServer, AppState};
use kiln_core::{MemoryCredentialStore, MemoryExecutionStore};
use kiln_engine::{EngineConfig, HttpEngine};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// ServerRuntime
// =============================================================================

/// The main runtime that orchestrates all components.
pub struct ServerRuntime {
    config: ApiConfig,
    engine_config: EngineConfig,
    shutdown: ShutdownCoordinator,
}

impl ServerRuntime {
    /// Creates a new runtime.
    pub fn new(config: ApiConfig, engine_config: EngineConfig) -> Self {
        Self {
            config,
            engine_config,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Runs the server until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting Kiln v{}", kiln_core::VERSION);

        let engine = HttpEngine::new(self.engine_config.clone())
            .map_err(|e| BinError::init(format!("Failed to build engine client: {}", e)))?;
        info!("Engine client configured for {}", engine.base_url());

        let state = AppState::builder()
            .config(self.config.clone())
            .credential_store(Arc::new(MemoryCredentialStore::new()))
            .execution_store(Arc::new(MemoryExecutionStore::new()))
            .engine(Arc::new(engine))
            .build()?;

        let server = ApiServer::new(state);

        let shutdown = self.shutdown.clone();
        let signal = async move {
            shutdown.wait_for_shutdown().await;
        };

        server.run_with_shutdown(signal).await?;

        info!("Kiln shutdown complete");

        Ok(())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the server runtime.
pub struct RuntimeBuilder {
    config: Option<ApiConfig>,
    engine_config: Option<EngineConfig>,
    port_override: Option<u16>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config: None,
            engine_config: None,
            port_override: None,
        }
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the engine configuration directly.
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = Some(config);
        self
    }

    /// Overrides the listen port.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port_override = port;
        self
    }

    /// Builds the runtime, reading anything unset from the environment.
    pub fn build(self) -> BinResult<ServerRuntime> {
        let mut config = match self.config {
            Some(config) => config,
            None => ApiConfig::from_env()
                .map_err(|e| BinError::config(format!("Failed to load configuration: {}", e)))?,
        };
        if let Some(port) = self.port_override {
            config.port = port;
        }

        config
            .validate()
            .map_err(|e| BinError::config(e.to_string()))?;

        let engine_config = match self.engine_config {
            Some(config) => config,
            None => engine_config_from_env()?,
        };

        Ok(ServerRuntime::new(config, engine_config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the engine client configuration from `KILN_ENGINE_*` variables.
pub fn engine_config_from_env() -> BinResult<EngineConfig> {
    let mut config = EngineConfig::default();

    if let Ok(url) = std::env::var("KILN_ENGINE_URL") {
        config.base_url = url;
    }
    if let Ok(timeout) = std::env::var("KILN_ENGINE_TIMEOUT_SECS") {
        let secs: u64 = timeout
            .parse()
            .map_err(|_| BinError::config(format!("invalid KILN_ENGINE_TIMEOUT_SECS: {}", timeout)))?;
        config.request_timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_api::auth::TokenConfig;

    fn test_config() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.tokens = TokenConfig::new(
            "access-secret-long-enough-for-testing-purposes",
            "refresh-secret-long-enough-for-testing-purposes",
        );
        config
    }

    #[test]
    fn test_runtime_builder() {
        let runtime = RuntimeBuilder::new()
            .config(test_config())
            .engine_config(EngineConfig::default())
            .port(Some(9100))
            .build()
            .unwrap();

        assert_eq!(runtime.config.port, 9100);
    }

    #[test]
    fn test_runtime_builder_rejects_invalid_config() {
        // Default token config has empty secrets.
        let result = RuntimeBuilder::new()
            .config(ApiConfig::default())
            .engine_config(EngineConfig::default())
            .build();

        assert!(result.is_err());
    }
}
