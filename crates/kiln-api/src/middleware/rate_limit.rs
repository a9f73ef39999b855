// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Rate limiting middleware.
//!
//! Per-IP token buckets over a shared window. The server applies three
//! tiers: a strict one on the credential endpoints (brute-force
//! protection), a moderate one on the execution endpoints, and a relaxed
//! one on the rest of the API.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use crate::error::ApiError;

// =============================================================================
// RateLimitConfig
// =============================================================================

/// Configuration for one rate limiting tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Requests allowed per IP per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 900, // 15 minutes
        }
    }
}

impl RateLimitConfig {
    /// Creates a tier with the given budget.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            enabled: true,
            max_requests,
            window_secs,
        }
    }

    /// Strict tier for credential endpoints.
    pub fn auth(window_secs: u64) -> Self {
        Self::new(5, window_secs)
    }

    /// Moderate tier for execution endpoints.
    pub fn execution(window_secs: u64) -> Self {
        Self::new(30, window_secs)
    }

    /// Relaxed tier for the general API.
    pub fn general(max_requests: u32, window_secs: u64) -> Self {
        Self::new(max_requests, window_secs)
    }

    /// Creates a disabled limiter.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

// =============================================================================
// Token Bucket
// =============================================================================

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_tokens: u32, window: Duration) -> Self {
        Self {
            tokens: max_tokens as f64,
            max_tokens: max_tokens as f64,
            refill_rate: max_tokens as f64 / window.as_secs_f64().max(1.0),
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn time_until_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let needed = 1.0 - self.tokens;
            Duration::from_secs_f64(needed / self.refill_rate)
        }
    }
}

// =============================================================================
// Rate Limiter State
// =============================================================================

/// Shared state for one rate limiting tier.
#[derive(Debug)]
pub struct RateLimiterState {
    config: RateLimitConfig,
    buckets: DashMap<IpAddr, TokenBucket>,
}

/// Outcome of a rate limit check.
enum RateLimitResult {
    Allowed,
    Limited { retry_after: u64 },
}

impl RateLimiterState {
    /// Table size beyond which fully-refilled buckets are dropped.
    const PRUNE_THRESHOLD: usize = 10_000;

    fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    fn check(&self, client_ip: Option<IpAddr>) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        if self.buckets.len() > Self::PRUNE_THRESHOLD {
            self.prune();
        }

        // Requests without a resolvable peer address share one bucket.
        let ip = client_ip.unwrap_or(IpAddr::from([0, 0, 0, 0]));
        let window = Duration::from_secs(self.config.window_secs);

        let mut bucket = self
            .buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.config.max_requests, window));

        if bucket.try_acquire() {
            RateLimitResult::Allowed
        } else {
            RateLimitResult::Limited {
                retry_after: bucket.time_until_token().as_secs().max(1),
            }
        }
    }

    /// Drops buckets that have fully refilled; they carry no state worth
    /// keeping.
    fn prune(&self) {
        self.buckets.retain(|_, bucket| {
            bucket.refill();
            bucket.tokens < bucket.max_tokens
        });
    }
}

// =============================================================================
// RateLimitLayer
// =============================================================================

/// Layer applying one rate limiting tier.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimiterState>,
}

impl RateLimitLayer {
    /// Creates a new rate limiting layer.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(RateLimiterState::new(config)),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Middleware enforcing one rate limiting tier.
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    state: Arc<RateLimiterState>,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip());

        let state = self.state.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match state.check(client_ip) {
                RateLimitResult::Allowed => inner.call(req).await,
                RateLimitResult::Limited { retry_after } => {
                    tracing::debug!(?client_ip, retry_after, "Request rate limited");
                    Ok(ApiError::rate_limit_exceeded(Some(retry_after)).into_response())
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
