// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for accounts and execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// AccountId
// =============================================================================

/// Unique identifier for an account.
///
/// Backed by a UUIDv7 so identifiers sort roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generates a new account identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// =============================================================================
// Account
// =============================================================================

/// A stored account record.
///
/// The password hash is write-only from the caller's perspective: input is
/// plaintext, the stored value is irreversibly hashed, and the hash is never
/// serialized to callers (`Account` deliberately does not implement
/// `Serialize`; use [`IdentitySnapshot`] for anything caller-facing).
///
/// `refresh_handle` is the single stored copy of the currently-valid refresh
/// token. Overwriting it invalidates the previous refresh token; clearing it
/// invalidates all of them. Exactly one session per account is valid at a
/// time; the rotation reuse-detection protocol depends on it.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Display name (2–50 characters).
    pub name: String,
    /// Email address, stored lowercase, unique across accounts.
    pub email: String,
    /// Argon2 PHC-format password hash.
    pub password_hash: String,
    /// The currently-valid refresh token, if any session is active.
    pub refresh_handle: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns the caller-facing projection of this account.
    pub fn snapshot(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    /// Returns `true` if an active session exists (a refresh handle is set).
    pub fn has_session(&self) -> bool {
        self.refresh_handle.is_some()
    }
}

// =============================================================================
// IdentitySnapshot
// =============================================================================

/// The minimal caller-facing projection of an account.
///
/// Produced fresh on every access-token verification by resolving the token
/// subject against the credential store, never cached across requests, so
/// a deleted account is reflected immediately even while its access token is
/// still cryptographically valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// Account identifier.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ExecutionId
// =============================================================================

/// Unique identifier for an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Generates a new execution identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ExecutionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// =============================================================================
// ExecutionRecord
// =============================================================================

/// A persisted record of one code execution or analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique identifier.
    pub id: ExecutionId,
    /// Owning account.
    pub account_id: AccountId,
    /// The submitted source code.
    pub code: String,
    /// Captured stdout of the run.
    pub output: String,
    /// Errors reported by the engine.
    pub errors: Vec<String>,
    /// Wall-clock execution time in seconds.
    pub execution_time: f64,
    /// Optimization score (0–100), present for analysis runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_score: Option<f64>,
    /// Complexity class label, present for analysis runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_class: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// History Query
// =============================================================================

/// Sort field for history queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Sort by record creation time (default).
    #[default]
    CreatedAt,
    /// Sort by execution time.
    ExecutionTime,
    /// Sort by optimization score; records without a score sort last.
    OptimizationScore,
}

/// Sort direction for history queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending order.
    Asc,
    /// Descending order (default).
    #[default]
    Desc,
}

/// Query parameters for paginated history listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryQuery {
    /// Page number, 1-indexed.
    pub page: u32,
    /// Items per page, capped at [`HistoryQuery::MAX_PER_PAGE`].
    pub per_page: u32,
    /// Optional case-insensitive substring filter over the submitted code.
    pub search: Option<String>,
    /// Sort field.
    pub sort_by: SortField,
    /// Sort direction.
    pub order: SortOrder,
}

impl HistoryQuery {
    /// Maximum allowed page size.
    pub const MAX_PER_PAGE: u32 = 50;

    /// Maximum allowed search string length.
    pub const MAX_SEARCH_LEN: usize = 200;

    /// Returns the effective page size after clamping.
    pub fn limit(&self) -> usize {
        self.per_page.clamp(1, Self::MAX_PER_PAGE) as usize
    }

    /// Returns the number of records to skip.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.limit()
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            search: None,
            sort_by: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

/// One page of history results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Records on this page.
    pub records: Vec<ExecutionRecord>,
    /// Total matching records across all pages.
    pub total: u64,
    /// Page number, 1-indexed.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total page count.
    pub total_pages: u32,
}

impl HistoryPage {
    /// Builds a page from a slice of results and the total match count.
    pub fn new(records: Vec<ExecutionRecord>, total: u64, query: &HistoryQuery) -> Self {
        let per_page = query.limit() as u32;
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as u32;
        Self {
            records,
            total,
            page: query.page.max(1),
            per_page,
            total_pages,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_roundtrip() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_snapshot_excludes_secrets() {
        let account = Account {
            id: AccountId::new(),
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            refresh_handle: Some("token".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let snapshot = account.snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["name"], "Ada");
        assert_eq!(json["email"], "ada@x.com");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refresh_handle").is_none());
    }

    #[test]
    fn test_history_query_defaults() {
        let query = HistoryQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 20);
        assert_eq!(query.sort_by, SortField::CreatedAt);
        assert_eq!(query.order, SortOrder::Desc);
    }

    #[test]
    fn test_history_query_clamping() {
        let query = HistoryQuery {
            page: 3,
            per_page: 500,
            ..Default::default()
        };

        assert_eq!(query.limit(), 50);
        assert_eq!(query.offset(), 100);
    }

    #[test]
    fn test_history_page_counts() {
        let query = HistoryQuery {
            per_page: 10,
            ..Default::default()
        };
        let page = HistoryPage::new(Vec::new(), 25, &query);

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.per_page, 10);
    }
}
