// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory store implementations.
//!
//! Used for development and testing. A single `RwLock` per store gives the
//! serialization the [`CredentialStore`] contract demands: the refresh-handle
//! compare-and-overwrite runs entirely under the write lock, so two racing
//! rotations against the same stale token cannot both observe a match.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::store::{CredentialStore, ExecutionStore, NewAccount};
use crate::types::{
    Account, AccountId, ExecutionId, ExecutionRecord, HistoryPage, HistoryQuery, SortField,
    SortOrder,
};

// =============================================================================
// MemoryCredentialStore
// =============================================================================

/// In-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    /// Returns `true` if no accounts are stored.
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let needle = email.trim().to_lowercase();
        let accounts = self.accounts.read();
        Ok(accounts.values().find(|a| a.email == needle).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account> {
        let email = account.email.trim().to_lowercase();
        let mut accounts = self.accounts.write();

        if accounts.values().any(|a| a.email == email) {
            return Err(Error::conflict("An account with this email already exists"));
        }

        let now = Utc::now();
        let record = Account {
            id: AccountId::new(),
            name: account.name,
            email,
            password_hash: account.password_hash,
            refresh_handle: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(record.id, record.clone());

        Ok(record)
    }

    async fn set_refresh_handle(&self, id: AccountId, handle: Option<&str>) -> Result<()> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Account"))?;

        account.refresh_handle = handle.map(|h| h.to_string());
        account.updated_at = Utc::now();

        Ok(())
    }

    async fn replace_refresh_handle(
        &self,
        id: AccountId,
        expected: &str,
        new: &str,
    ) -> Result<bool> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("Account"))?;

        // Compare and overwrite under one lock. A cleared handle never
        // matches: a logged-out session cannot rotate.
        if account.refresh_handle.as_deref() != Some(expected) {
            return Ok(false);
        }

        account.refresh_handle = Some(new.to_string());
        account.updated_at = Utc::now();

        Ok(true)
    }
}

// =============================================================================
// MemoryExecutionStore
// =============================================================================

/// In-memory [`ExecutionStore`].
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    records: RwLock<HashMap<ExecutionId, ExecutionRecord>>,
}

impl MemoryExecutionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records across all accounts.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn insert(&self, record: ExecutionRecord) -> Result<()> {
        self.records.write().insert(record.id, record);
        Ok(())
    }

    async fn query(&self, account: AccountId, query: &HistoryQuery) -> Result<HistoryPage> {
        let records = self.records.read();

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<ExecutionRecord> = records
            .values()
            .filter(|r| r.account_id == account)
            .filter(|r| match &search {
                Some(needle) => r.code.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect();

        sort_records(&mut matches, query.sort_by, query.order);

        let total = matches.len() as u64;
        let page: Vec<ExecutionRecord> = matches
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect();

        Ok(HistoryPage::new(page, total, query))
    }

    async fn find(&self, account: AccountId, id: ExecutionId) -> Result<ExecutionRecord> {
        self.records
            .read()
            .get(&id)
            .filter(|r| r.account_id == account)
            .cloned()
            .ok_or_else(|| Error::not_found("Execution record"))
    }

    async fn delete(&self, account: AccountId, id: ExecutionId) -> Result<()> {
        let mut records = self.records.write();

        match records.get(&id) {
            Some(r) if r.account_id == account => {
                records.remove(&id);
                Ok(())
            }
            _ => Err(Error::not_found("Execution record")),
        }
    }

    async fn clear(&self, account: AccountId) -> Result<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| r.account_id != account);
        Ok(before - records.len())
    }
}

fn sort_records(records: &mut [ExecutionRecord], field: SortField, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = match field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::ExecutionTime => a
                .execution_time
                .partial_cmp(&b.execution_time)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortField::OptimizationScore => match (a.optimization_score, b.optimization_score) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (None, None) => std::cmp::Ordering::Equal,
            },
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

// =============================================================================
// Tests
// =============================================================================
