// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Token signing and verification.
//!
//! Access and refresh tokens are signed with **different** secrets, so a
//! leaked access-signing key cannot be used to mint refresh tokens. The
//! manager therefore carries two key pairs and exposes kind-specific verify
//! methods: a refresh token never verifies against the access key, and vice
//! versa. There is no fallback between the two.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use kiln_core::{AccountId, Error, Result};

use super::Claims;

// =============================================================================
// TokenConfig
// =============================================================================

/// Token signing configuration.
///
/// Constructed once at process start and handed to the identity authority
/// and session verifier by reference; core logic never reads secrets from
/// ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Secret for signing access tokens.
    #[serde(skip_serializing)]
    pub access_secret: String,
    /// Secret for signing refresh tokens. Must differ from the access secret.
    #[serde(skip_serializing)]
    pub refresh_secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
    /// Token issuer.
    pub issuer: String,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(), // Must be set by the operator
            refresh_secret: String::new(),
            access_ttl_secs: 15 * 60,           // 15 minutes
            refresh_ttl_secs: 30 * 24 * 3600,   // 30 days
            issuer: "kiln".to_string(),
            leeway_secs: 60,
        }
    }
}

impl TokenConfig {
    /// Creates a configuration with the given secrets.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            ..Default::default()
        }
    }

    /// Sets the access token lifetime.
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl_secs = ttl.as_secs() as i64;
        self
    }

    /// Sets the refresh token lifetime.
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl_secs = ttl.as_secs() as i64;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(Error::internal("Token signing secrets are not configured"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(Error::internal(
                "Access and refresh tokens must use different signing secrets",
            ));
        }
        if self.access_secret.len() < 32 || self.refresh_secret.len() < 32 {
            tracing::warn!("Token signing secret is shorter than recommended (32 bytes)");
        }
        Ok(())
    }
}

// =============================================================================
// TokenPair
// =============================================================================

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access: String,
    /// Long-lived refresh token. Also persisted as the account's refresh
    /// handle; the previous pair's refresh token dies with the overwrite.
    pub refresh: String,
}

// =============================================================================
// TokenManager
// =============================================================================

/// Signs and verifies the two token kinds.
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<TokenConfig>,
    access_encoding: Arc<EncodingKey>,
    access_decoding: Arc<DecodingKey>,
    refresh_encoding: Arc<EncodingKey>,
    refresh_decoding: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenManager {
    /// Creates a new token manager with the given configuration.
    pub fn new(config: TokenConfig) -> Result<Self> {
        config.validate()?;

        let access_encoding = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.leeway = config.leeway_secs;
        validation.validate_aud = false;

        Ok(Self {
            config: Arc::new(config),
            access_encoding: Arc::new(access_encoding),
            access_decoding: Arc::new(access_decoding),
            refresh_encoding: Arc::new(refresh_encoding),
            refresh_decoding: Arc::new(refresh_decoding),
            validation: Arc::new(validation),
        })
    }

    /// Issues an access/refresh pair for an account.
    pub fn issue_pair(&self, account_id: AccountId) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue_access(account_id)?,
            refresh: self.issue_refresh(account_id)?,
        })
    }

    /// Issues a short-lived access token.
    pub fn issue_access(&self, account_id: AccountId) -> Result<String> {
        let claims =
            Claims::new(account_id, self.config.access_ttl_secs).with_issuer(&self.config.issuer);
        self.sign(&claims, &self.access_encoding)
    }

    /// Issues a long-lived refresh token.
    pub fn issue_refresh(&self, account_id: AccountId) -> Result<String> {
        let claims =
            Claims::new(account_id, self.config.refresh_ttl_secs).with_issuer(&self.config.issuer);
        self.sign(&claims, &self.refresh_encoding)
    }

    /// Verifies an access token's signature and expiry.
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        self.verify(token, &self.access_decoding, "Invalid or expired access token")
    }

    /// Verifies a refresh token's signature and expiry.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims> {
        self.verify(token, &self.refresh_decoding, "Invalid or expired refresh token")
    }

    /// Returns the access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl_secs
    }

    /// Returns the refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.config.refresh_ttl_secs
    }

    fn sign(&self, claims: &Claims, key: &EncodingKey) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, key)
            .map_err(|e| Error::internal(format!("Failed to sign token: {}", e)))
    }

    fn verify(&self, token: &str, key: &DecodingKey, message: &str) -> Result<Claims> {
        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                // One message per token kind, regardless of which check
                // failed: signature, expiry, and format are not
                // distinguishable from the outside.
                Error::unauthenticated(message)
            })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.config.issuer)
            .field("access_ttl_secs", &self.config.access_ttl_secs)
            .field("refresh_ttl_secs", &self.config.refresh_ttl_secs)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig::new(
            "access-secret-long-enough-for-testing-purposes",
            "refresh-secret-long-enough-for-testing-purposes",
        )
    }

    #[test]
    fn test_config_requires_distinct_secrets() {
        let config = TokenConfig::new("same-secret-used-for-both-token-kinds", "same-secret-used-for-both-token-kinds");
        assert!(config.validate().is_err());

        let config = TokenConfig::default();
        assert!(config.validate().is_err());

        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_issue_and_verify_access() {
        let manager = TokenManager::new(test_config()).unwrap();
        let id = AccountId::new();

        let token = manager.issue_access(id).unwrap();
        let claims = manager.verify_access(&token).unwrap();

        assert_eq!(claims.account_id().unwrap(), id);
    }

    #[test]
    fn test_keys_are_not_interchangeable() {
        let manager = TokenManager::new(test_config()).unwrap();
        let id = AccountId::new();

        let access = manager.issue_access(id).unwrap();
        let refresh = manager.issue_refresh(id).unwrap();

        // A refresh token must not verify as an access token, and vice versa.
        assert!(manager.verify_access(&refresh).is_err());
        assert!(manager.verify_refresh(&access).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = TokenConfig {
            access_ttl_secs: -3600,
            leeway_secs: 0,
            ..test_config()
        };
        let manager = TokenManager::new(config).unwrap();

        let token = manager.issue_access(AccountId::new()).unwrap();
        assert!(manager.verify_access(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = TokenManager::new(test_config()).unwrap();
        let token = manager.issue_access(AccountId::new()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(manager.verify_access(&tampered).is_err());

        assert!(manager.verify_access("definitely.not.ajwt").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager1 = TokenManager::new(test_config()).unwrap();
        let manager2 = TokenManager::new(TokenConfig::new(
            "different-access-secret-for-testing-here",
            "different-refresh-secret-for-testing-here",
        ))
        .unwrap();

        let token = manager1.issue_access(AccountId::new()).unwrap();
        assert!(manager2.verify_access(&token).is_err());
    }
}
