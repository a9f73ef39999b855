// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pre-built test data and configurations.

use chrono::Utc;

use kiln_api::auth::TokenConfig;
use kiln_api::ApiConfig;
use kiln_core::{AccountId, ExecutionId, ExecutionRecord};

/// A token configuration with distinct, long-enough test secrets.
pub fn token_config() -> TokenConfig {
    TokenConfig::new(
        "access-secret-long-enough-for-testing-purposes",
        "refresh-secret-long-enough-for-testing-purposes",
    )
}

/// An API configuration for tests: test secrets, rate limiting off.
///
/// Rate limiting is exercised by dedicated tests via
/// [`api_config_with_rate_limits`]; everywhere else it would only make
/// tests order-dependent.
pub fn api_config() -> ApiConfig {
    let mut config = ApiConfig::default().with_tokens(token_config());
    config.rate_limit.enabled = false;
    config
}

/// An API configuration with rate limiting enabled.
pub fn api_config_with_rate_limits() -> ApiConfig {
    ApiConfig::default().with_tokens(token_config())
}

/// Builds an execution record owned by `account`.
pub fn execution_record(account: AccountId, code: &str) -> ExecutionRecord {
    ExecutionRecord {
        id: ExecutionId::new(),
        account_id: account,
        code: code.to_string(),
        output: "output\n".to_string(),
        errors: Vec::new(),
        execution_time: 0.1,
        optimization_score: None,
        complexity_class: None,
        created_at: Utc::now(),
    }
}

/// Builds an analysis record with a score.
pub fn analysis_record(account: AccountId, code: &str, score: f64) -> ExecutionRecord {
    ExecutionRecord {
        optimization_score: Some(score),
        complexity_class: Some("O(n)".to_string()),
        ..execution_record(account, code)
    }
}
