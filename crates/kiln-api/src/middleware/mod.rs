// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Middleware implementations for the API server.
//!
//! - [`SessionLayer`]: per-request access token verification
//! - [`RateLimitLayer`]: per-IP token bucket rate limiting

mod rate_limit;
mod session;

pub use rate_limit::{RateLimitConfig, RateLimitLayer};
pub use session::{SessionLayer, SessionMiddleware};
