// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # kiln-api
//!
//! REST API server for the Kiln code-execution backend.
//!
//! This crate hosts the two components with real invariants, the identity
//! authority ([`auth::IdentityService`]) and the session verifier
//! ([`middleware::SessionLayer`]), plus the thin orchestration around them:
//! execution proxying, history queries, rate limiting, and the HTTP surface.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use server::ApiServer;
pub use state::AppState;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
