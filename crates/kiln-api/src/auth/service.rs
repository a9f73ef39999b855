// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The identity authority.
//!
//! Owns the account lifecycle (register, verify credentials) and the token
//! lifecycle (issue, rotate, revoke). All five operations are request-scoped
//! and stateless between requests; the only mutable state they touch is the
//! single refresh handle on the account record.
//!
//! Rotation protocol: a refresh token is valid only while it equals the
//! account's stored handle byte for byte. Issuing a new pair overwrites the
//! handle, which implicitly invalidates the previous refresh token, so a
//! token that has been rotated past, or that belongs to a logged-out
//! session, is rejected even though its signature is still good. A stolen
//! refresh token is therefore detectable on the next legitimate rotation
//! (the handles no longer match), at the cost of not detecting the first
//! theft. That trade-off is inherited from the protocol, not a bug.

use std::sync::Arc;

use kiln_core::{
    password, CredentialStore, Error, IdentitySnapshot, NewAccount, Result,
};

use super::tokens::{TokenManager, TokenPair};

// =============================================================================
// IdentityService
// =============================================================================

/// The identity authority: account and token lifecycle.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenManager,
}

impl IdentityService {
    /// Creates a new identity service.
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenManager) -> Self {
        Self { store, tokens }
    }

    /// Returns the token manager.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    // =========================================================================
    // Register
    // =========================================================================

    /// Creates an account and issues its first token pair.
    ///
    /// Input is validated at the transport boundary before it reaches this
    /// operation. Fails with `Conflict` if the email is already taken.
    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<(IdentitySnapshot, TokenPair)> {
        // Hashing is memory-hard and deliberately slow; run it on the
        // blocking pool, and always before any store call so no store lock
        // is ever held across it.
        let password_hash = hash_on_blocking_pool(password).await?;

        let account = self
            .store
            .create(NewAccount {
                name,
                email,
                password_hash,
            })
            .await?;

        let pair = self.tokens.issue_pair(account.id)?;
        self.store
            .set_refresh_handle(account.id, Some(&pair.refresh))
            .await?;

        tracing::info!(account_id = %account.id, "Account registered");

        Ok((account.snapshot(), pair))
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Verifies credentials and issues a fresh token pair.
    ///
    /// Unknown email and wrong password fail identically: the caller learns
    /// only that the combination was wrong, never which half.
    pub async fn login(
        &self,
        email: &str,
        password: String,
    ) -> Result<(IdentitySnapshot, TokenPair)> {
        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(Error::invalid_credentials)?;

        let hash = account.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || {
            password::verify_password(&hash, &password)
        })
        .await
        .map_err(|e| Error::internal(format!("verification task failed: {}", e)))?;

        if !verified {
            return Err(Error::invalid_credentials());
        }

        // Overwriting the handle silently supersedes any session issued by
        // an earlier login on another device: one live session per account.
        let pair = self.tokens.issue_pair(account.id)?;
        self.store
            .set_refresh_handle(account.id, Some(&pair.refresh))
            .await?;

        tracing::info!(account_id = %account.id, "Login succeeded");

        Ok((account.snapshot(), pair))
    }

    // =========================================================================
    // Rotate
    // =========================================================================

    /// Exchanges a valid refresh token for a brand-new token pair.
    ///
    /// The presented token must pass signature and expiry checks against the
    /// refresh key (never the access key), resolve to a live account, and
    /// equal the account's stored handle byte for byte. The overwrite of the
    /// handle is atomic per account: of two concurrent rotations presenting
    /// the same token, exactly one wins.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair> {
        let claims = self
            .tokens
            .verify_refresh(presented)
            .map_err(|_| Error::invalid_refresh_token())?;

        let account_id = claims
            .account_id()
            .map_err(|_| Error::invalid_refresh_token())?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(Error::invalid_refresh_token)?;

        let pair = self.tokens.issue_pair(account.id)?;

        let swapped = self
            .store
            .replace_refresh_handle(account.id, presented, &pair.refresh)
            .await?;

        if !swapped {
            // The token is cryptographically valid but no longer current:
            // either it was already rotated past, or the session was logged
            // out. Either way this is a reuse, and it gets the same generic
            // rejection as every other refresh failure.
            tracing::warn!(
                account_id = %account.id,
                "Refresh token reuse detected"
            );
            return Err(Error::invalid_refresh_token());
        }

        tracing::debug!(account_id = %account.id, "Token pair rotated");

        Ok(pair)
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// Clears the stored refresh handle unconditionally.
    ///
    /// Idempotent: logging out twice is not an error. Already-issued access
    /// tokens stay valid until they expire, a known latency window of at
    /// most the access TTL.
    pub async fn logout(&self, account_id: kiln_core::AccountId) -> Result<()> {
        match self.store.set_refresh_handle(account_id, None).await {
            Ok(()) => {
                tracing::info!(account_id = %account_id, "Logged out");
                Ok(())
            }
            // The account vanished between authentication and logout; there
            // is nothing left to clear.
            Err(Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Authenticate
    // =========================================================================

    /// Validates an access token and resolves it to an identity snapshot.
    ///
    /// A pure read-and-verify gate: verifies signature and expiry against
    /// the access key, then resolves the subject against the credential
    /// store, fresh on every call and never cached, so a deleted account is
    /// rejected immediately even while its token is cryptographically
    /// valid. Never mutates state and never touches the refresh handle.
    pub async fn authenticate(&self, token: &str) -> Result<IdentitySnapshot> {
        let claims = self.tokens.verify_access(token)?;
        let account_id = claims.account_id()?;

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| Error::unauthenticated("Invalid or expired access token"))?;

        Ok(account.snapshot())
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("tokens", &self.tokens)
            .finish()
    }
}

async fn hash_on_blocking_pool(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| Error::internal(format!("hashing task failed: {}", e)))?
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::MemoryCredentialStore;

    use crate::auth::TokenConfig;

    fn service() -> IdentityService {
        let store = Arc::new(MemoryCredentialStore::new());
        let tokens = TokenManager::new(TokenConfig::new(
            "access-secret-long-enough-for-testing-purposes",
            "refresh-secret-long-enough-for-testing-purposes",
        ))
        .unwrap();
        IdentityService::new(store, tokens)
    }

    async fn register_ada(service: &IdentityService) -> (IdentitySnapshot, TokenPair) {
        service
            .register(
                "Ada".to_string(),
                "ada@x.com".to_string(),
                "password123".to_string(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let service = service();
        let (snapshot, pair) = register_ada(&service).await;

        assert_eq!(snapshot.name, "Ada");
        assert_eq!(snapshot.email, "ada@x.com");
        assert!(!pair.access.is_empty());
        assert!(!pair.refresh.is_empty());

        let verified = service.authenticate(&pair.access).await.unwrap();
        assert_eq!(verified.id, snapshot.id);
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts() {
        let service = service();
        let (first, _) = register_ada(&service).await;

        let err = service
            .register(
                "Ada Again".to_string(),
                "ada@x.com".to_string(),
                "password456".to_string(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        // The first account is untouched.
        let (snapshot, _) = service.login("ada@x.com", "password123".to_string()).await.unwrap();
        assert_eq!(snapshot.id, first.id);
        assert_eq!(snapshot.name, "Ada");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = service();
        register_ada(&service).await;

        let wrong_password = service
            .login("ada@x.com", "wrongpass".to_string())
            .await
            .unwrap_err();
        let unknown_email = service
            .login("nobody@x.com", "password123".to_string())
            .await
            .unwrap_err();

        assert_eq!(wrong_password.error_code(), unknown_email.error_code());
        assert_eq!(wrong_password.user_message(), unknown_email.user_message());
    }

    #[tokio::test]
    async fn test_rotation_is_single_use() {
        let service = service();
        let (_, pair) = register_ada(&service).await;

        // First rotation succeeds and yields a different refresh token.
        let rotated = service.rotate(&pair.refresh).await.unwrap();
        assert_ne!(rotated.refresh, pair.refresh);

        // Replaying the original refresh token is detected as reuse.
        let err = service.rotate(&pair.refresh).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");

        // The token from the successful rotation still works exactly once.
        service.rotate(&rotated.refresh).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_supersedes_previous_session() {
        let service = service();
        let (_, first_pair) = register_ada(&service).await;

        // A second login (e.g. another device) overwrites the handle.
        let (_, _second_pair) = service
            .login("ada@x.com", "password123".to_string())
            .await
            .unwrap();

        let err = service.rotate(&first_pair.refresh).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_logout_blocks_rotation_but_not_access() {
        let service = service();
        let (snapshot, pair) = register_ada(&service).await;

        service.logout(snapshot.id).await.unwrap();

        // Rotation with the pre-logout refresh token fails even though the
        // token itself is unexpired.
        assert!(service.rotate(&pair.refresh).await.is_err());

        // The unexpired access token still authenticates: revocation of
        // access tokens is by expiry only.
        assert!(service.authenticate(&pair.access).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let service = service();
        let (snapshot, _) = register_ada(&service).await;

        service.logout(snapshot.id).await.unwrap();
        service.logout(snapshot.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_rotate_rejects_access_token() {
        let service = service();
        let (_, pair) = register_ada(&service).await;

        // An access token must never pass the refresh verification path.
        let err = service.rotate(&pair.access).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_vanished_account() {
        let service = service();
        let tokens = service.tokens().clone();

        // A well-signed token for an account that was never created.
        let ghost = tokens.issue_access(kiln_core::AccountId::new()).unwrap();
        let err = service.authenticate(&ghost).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }
}
