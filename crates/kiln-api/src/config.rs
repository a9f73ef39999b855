// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server configuration.
//!
//! Built once at process start (from defaults, the environment, or tests)
//! and passed by reference into everything that needs it. Core logic never
//! reads configuration from ambient state.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kiln_core::{Error, Result};

use crate::auth::TokenConfig;
use crate::middleware::RateLimitConfig;

// =============================================================================
// Environment
// =============================================================================

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development: relaxed cookie attributes, default secrets allowed.
    #[default]
    Development,
    /// Production: `Secure` cookies, operator-supplied secrets required.
    Production,
}

impl Environment {
    /// Parses an environment name; anything unrecognized is development.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Returns `true` in production.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

// =============================================================================
// ApiConfig
// =============================================================================

/// Configuration for the API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host address.
    pub host: IpAddr,
    /// Server port.
    pub port: u16,
    /// Deployment environment.
    pub environment: Environment,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Token signing configuration.
    pub tokens: TokenConfig,
    /// Rate limiting configuration.
    pub rate_limit: RateLimitSettings,
    /// Request timeout.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5000,
            environment: Environment::Development,
            cors: CorsConfig::default(),
            tokens: TokenConfig::default(),
            rate_limit: RateLimitSettings::default(),
            request_timeout: Duration::from_secs(60),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ApiConfig {
    /// Development-only fallback secrets. Rejected in production.
    const DEV_ACCESS_SECRET: &'static str = "change-this-access-secret-in-production";
    const DEV_REFRESH_SECRET: &'static str = "change-this-refresh-secret-in-production";

    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `KILN_*` environment variables.
    ///
    /// Unset variables fall back to development defaults, including signing
    /// secrets; [`ApiConfig::validate`] refuses those defaults outside
    /// development.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("KILN_HOST") {
            config.host = host
                .parse()
                .map_err(|_| Error::internal(format!("invalid KILN_HOST: {}", host)))?;
        }
        if let Some(port) = env_parse("KILN_PORT")? {
            config.port = port;
        }
        if let Ok(environment) = env::var("KILN_ENV") {
            config.environment = Environment::parse(&environment);
        }

        config.tokens.access_secret = env::var("KILN_ACCESS_TOKEN_SECRET")
            .unwrap_or_else(|_| Self::DEV_ACCESS_SECRET.to_string());
        config.tokens.refresh_secret = env::var("KILN_REFRESH_TOKEN_SECRET")
            .unwrap_or_else(|_| Self::DEV_REFRESH_SECRET.to_string());
        if let Some(ttl) = env_parse("KILN_ACCESS_TOKEN_TTL_SECS")? {
            config.tokens.access_ttl_secs = ttl;
        }
        if let Some(ttl) = env_parse("KILN_REFRESH_TOKEN_TTL_SECS")? {
            config.tokens.refresh_ttl_secs = ttl;
        }

        if let Ok(origin) = env::var("KILN_CORS_ORIGIN") {
            config.cors.allowed_origin = origin;
        }

        if let Some(window) = env_parse("KILN_RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit.window_secs = window;
        }
        if let Some(max) = env_parse("KILN_RATE_LIMIT_MAX_REQUESTS")? {
            config.rate_limit.general_max = max;
        }
        if let Ok(enabled) = env::var("KILN_RATE_LIMIT_ENABLED") {
            config.rate_limit.enabled = enabled.parse().unwrap_or(true);
        }

        if let Some(secs) = env_parse::<u64>("KILN_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_production() {
            let defaulted = self.tokens.access_secret == Self::DEV_ACCESS_SECRET
                || self.tokens.refresh_secret == Self::DEV_REFRESH_SECRET;
            if defaulted {
                return Err(Error::internal(
                    "Default signing secrets are not allowed in production",
                ));
            }
        }

        self.tokens.validate()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns `true` if cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the token configuration.
    pub fn with_tokens(mut self, tokens: TokenConfig) -> Self {
        self.tokens = tokens;
        self
    }

    /// Sets the environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::internal(format!("invalid {}: {}", key, value))),
        Err(_) => Ok(None),
    }
}

// =============================================================================
// CorsConfig
// =============================================================================

/// CORS (Cross-Origin Resource Sharing) configuration.
///
/// Cookies require credentialed CORS, which in turn requires a concrete
/// origin; wildcards do not work with `Access-Control-Allow-Credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// The single allowed browser origin.
    pub allowed_origin: String,
    /// Max age for preflight cache (seconds).
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "http://localhost:3000".to_string(),
            max_age: 3600,
        }
    }
}

// =============================================================================
// RateLimitSettings
// =============================================================================

/// Rate limiting budgets for the three route tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Whether rate limiting is enabled at all.
    pub enabled: bool,
    /// Window length in seconds, shared by all tiers.
    pub window_secs: u64,
    /// Budget for the general API tier.
    pub general_max: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 900,
            general_max: 100,
        }
    }
}

impl RateLimitSettings {
    /// Tier for the credential endpoints.
    pub fn auth_tier(&self) -> RateLimitConfig {
        self.tier(RateLimitConfig::auth(self.window_secs))
    }

    /// Tier for the execution endpoints.
    pub fn execution_tier(&self) -> RateLimitConfig {
        self.tier(RateLimitConfig::execution(self.window_secs))
    }

    /// Tier for the rest of the API.
    pub fn general_tier(&self) -> RateLimitConfig {
        self.tier(RateLimitConfig::general(self.general_max, self.window_secs))
    }

    fn tier(&self, mut config: RateLimitConfig) -> RateLimitConfig {
        config.enabled = self.enabled;
        config
    }
}

// =============================================================================
// duration_secs serde module
// =============================================================================

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 5000);
        assert!(!config.environment.is_production());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("PROD"), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("anything"), Environment::Development);
    }

    #[test]
    fn test_production_rejects_default_secrets() {
        let mut config = ApiConfig::default();
        config.tokens.access_secret = ApiConfig::DEV_ACCESS_SECRET.to_string();
        config.tokens.refresh_secret = ApiConfig::DEV_REFRESH_SECRET.to_string();

        assert!(config.validate().is_ok());

        config.environment = Environment::Production;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rate_limit_tiers_share_window() {
        let settings = RateLimitSettings {
            enabled: true,
            window_secs: 600,
            general_max: 42,
        };

        assert_eq!(settings.auth_tier().window_secs, 600);
        assert_eq!(settings.execution_tier().window_secs, 600);
        assert_eq!(settings.general_tier().max_requests, 42);

        let disabled = RateLimitSettings {
            enabled: false,
            ..settings
        };
        assert!(!disabled.auth_tier().enabled);
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig::default().with_port(9000);
        assert_eq!(config.socket_addr().port(), 9000);
    }
}
