// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Persistence contracts.
//!
//! These traits are the seam between the core and whatever database backs a
//! deployment. The in-memory implementations live in [`crate::memory`].

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Account, AccountId, ExecutionId, ExecutionRecord, HistoryPage, HistoryQuery};

// =============================================================================
// CredentialStore
// =============================================================================

/// Input for creating a new account.
///
/// The password arrives already hashed; the store never sees plaintext.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Email address; the store persists it lowercase.
    pub email: String,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
}

/// Persistence contract for account records.
///
/// Email uniqueness is enforced here, case-insensitively. All refresh-handle
/// mutations on the same account must be serialized by the implementation;
/// [`CredentialStore::replace_refresh_handle`] in particular must be atomic
/// with respect to concurrent calls on the same id, because token rotation
/// relies on exactly one of two racing compare-and-overwrite attempts
/// winning.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up an account by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Looks up an account by id.
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    /// Creates a new account.
    ///
    /// Fails with [`crate::Error::Conflict`] if the email is already taken.
    async fn create(&self, account: NewAccount) -> Result<Account>;

    /// Unconditionally sets or clears the stored refresh handle.
    ///
    /// Fails with [`crate::Error::NotFound`] if the account does not exist.
    async fn set_refresh_handle(&self, id: AccountId, handle: Option<&str>) -> Result<()>;

    /// Atomically replaces the refresh handle if it currently equals
    /// `expected`, byte for byte.
    ///
    /// Returns `true` if the swap happened, `false` if the stored handle did
    /// not match (including when it was empty). This is the per-account
    /// compare-and-overwrite that makes rotation's reuse detection sound
    /// under concurrency: of two racing rotations presenting the same stale
    /// token, at most one can observe a match.
    async fn replace_refresh_handle(
        &self,
        id: AccountId,
        expected: &str,
        new: &str,
    ) -> Result<bool>;
}

// =============================================================================
// ExecutionStore
// =============================================================================

/// Persistence contract for execution history.
///
/// Every operation is scoped to an owning account; a record is invisible to
/// any account other than the one that created it.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persists a new execution record.
    async fn insert(&self, record: ExecutionRecord) -> Result<()>;

    /// Returns one page of records matching the query.
    async fn query(&self, account: AccountId, query: &HistoryQuery) -> Result<HistoryPage>;

    /// Looks up a single record owned by `account`.
    ///
    /// Fails with [`crate::Error::NotFound`] if the record does not exist or
    /// belongs to a different account.
    async fn find(&self, account: AccountId, id: ExecutionId) -> Result<ExecutionRecord>;

    /// Deletes a single record owned by `account`.
    ///
    /// Fails with [`crate::Error::NotFound`] if the record does not exist or
    /// belongs to a different account.
    async fn delete(&self, account: AccountId, id: ExecutionId) -> Result<()>;

    /// Deletes every record owned by `account`, returning the count removed.
    async fn clear(&self, account: AccountId) -> Result<usize>;
}
