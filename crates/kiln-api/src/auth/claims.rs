// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT claims structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kiln_core::{AccountId, Error, Result};

/// Claims carried by both access and refresh tokens.
///
/// Kept minimal on purpose: the token proves *who* and *until when*; every
/// other fact about the account is resolved fresh from the credential store
/// at verification time, so tokens never go stale on name or email changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the account ID.
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at time (Unix timestamp).
    pub iat: i64,

    /// JWT ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Creates new claims for an account.
    pub fn new(account_id: AccountId, expires_in_secs: i64) -> Self {
        let now = Utc::now().timestamp();

        Self {
            sub: account_id.to_string(),
            exp: now + expires_in_secs,
            iat: now,
            jti: Some(Uuid::now_v7().to_string()),
            iss: None,
        }
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    /// Parses the subject into an [`AccountId`].
    pub fn account_id(&self) -> Result<AccountId> {
        self.sub
            .parse()
            .map_err(|_| Error::unauthenticated("Invalid or expired access token"))
    }

    /// Returns `true` if the token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Returns the expiration time as a `DateTime`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
