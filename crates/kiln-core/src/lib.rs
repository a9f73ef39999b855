// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # kiln-core
//!
//! Core abstractions and shared types for the Kiln code-execution backend.
//!
//! This crate provides the foundational pieces used across all Kiln
//! components:
//!
//! - **Types**: `AccountId`, `Account`, `IdentitySnapshot`, `ExecutionRecord`
//! - **Store**: persistence contracts (`CredentialStore`, `ExecutionStore`)
//!   and the in-memory implementations used for development and testing
//! - **Engine**: the contract for the remote interpreter service
//! - **Error**: the closed error taxonomy shared by every core operation
//! - **Password**: argon2 password hashing as an explicit, named step
//!
//! The account entity carries a single refresh-token handle. Exactly one
//! refresh token is valid per account at any time; issuing a new one
//! overwrites (and thereby invalidates) the previous one. See
//! [`store::CredentialStore::replace_refresh_handle`] for the atomic
//! compare-and-overwrite that token rotation depends on.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod memory;
pub mod password;
pub mod store;
pub mod types;

pub use engine::{
    AnalysisOutcome, EngineError, ExecutionEngine, ExecutionRequest, FunctionStats, LineStats,
    ProfilingData, RunOutcome, ScoreBreakdown,
};
pub use error::{Error, Result};
pub use memory::{MemoryCredentialStore, MemoryExecutionStore};
pub use store::{CredentialStore, ExecutionStore, NewAccount};
pub use types::{
    Account, AccountId, ExecutionId, ExecutionRecord, HistoryPage, HistoryQuery,
    IdentitySnapshot, SortField, SortOrder,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
