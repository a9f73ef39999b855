// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::info;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::handlers;
use crate::middleware::{RateLimitLayer, SessionLayer};
use crate::state::AppState;

// =============================================================================
// ApiServer
// =============================================================================

/// The API server.
///
/// This is the main entry point for creating and running the HTTP server.
pub struct ApiServer {
    state: AppState,
    config: Arc<ApiConfig>,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        Self { state, config }
    }

    /// Creates the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let cors = create_cors_layer(&self.config);
        let session = SessionLayer::new(self.state.identity.clone()).with_default_public_paths();

        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                axum::http::StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout,
            ))
            .layer(cors)
            .layer(session);

        // Credential endpoints get the strict brute-force tier; execution
        // endpoints the moderate one; everything else the relaxed one.
        let credential_routes = Router::new()
            .route("/api/v1/auth/register", post(handlers::register))
            .route("/api/v1/auth/login", post(handlers::login))
            .route("/api/v1/auth/refresh", post(handlers::refresh))
            .route_layer(RateLimitLayer::new(self.config.rate_limit.auth_tier()));

        let execution_routes = Router::new()
            .route("/api/v1/execute", post(handlers::execute))
            .route("/api/v1/analyze", post(handlers::analyze))
            .route_layer(RateLimitLayer::new(
                self.config.rate_limit.execution_tier(),
            ));

        let general_routes = Router::new()
            .route("/api/v1/auth/logout", post(handlers::logout))
            .route("/api/v1/auth/me", get(handlers::current_user))
            .route(
                "/api/v1/history",
                get(handlers::list_history).delete(handlers::clear_history),
            )
            .route(
                "/api/v1/history/{id}",
                get(handlers::get_execution).delete(handlers::delete_execution),
            )
            .route_layer(RateLimitLayer::new(self.config.rate_limit.general_tier()));

        Router::new()
            // Health endpoints (public, unlimited)
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::ready))
            .merge(credential_routes)
            .merge(execution_routes)
            .merge(general_routes)
            .fallback(handlers::not_found)
            .layer(middleware_stack)
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(self.state.clone())
    }

    /// Runs the server.
    pub async fn run(self) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| crate::error::ApiError::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Runs the server with graceful shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| crate::error::ApiError::internal(format!("Server error: {}", e)))?;

        info!("API server shutdown complete");

        Ok(())
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates the CORS layer from configuration.
///
/// Session cookies require credentialed CORS, which forbids wildcard
/// origins; only the configured origin is allowed.
fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.cors.max_age));

    match config.cors.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer = layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(
                origin = %config.cors.allowed_origin,
                "Invalid CORS origin; cross-origin requests will be refused"
            );
        }
    }

    layer
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiln_core::{
        AnalysisOutcome, EngineError, ExecutionEngine, ExecutionRequest, RunOutcome,
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

    fn test_state() -> AppState {
        AppState::builder()
            .config(ApiConfig::default().with_tokens(TokenConfig::new(
                "access-secret-long-enough-for-testing-purposes",
                "refresh-secret-long-enough-for-testing-purposes",
            )))
            .engine(Arc::new(OfflineEngine))
            .build()
            .unwrap()
    }

    #[test]
    fn test_server_addr() {
        let server = ApiServer::new(test_state());
        assert_eq!(server.addr().port(), 5000);
    }

    #[test]
    fn test_router_creation() {
        let server = ApiServer::new(test_state());
        let _router = server.router();
    }

    #[test]
    fn test_cors_layer() {
        let config = ApiConfig::default();
        let _layer = create_cors_layer(&config);
    }
}
