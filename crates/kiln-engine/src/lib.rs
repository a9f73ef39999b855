// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # kiln-engine
//!
//! HTTP client for the remote interpreter/analysis engine, implementing
//! [`kiln_core::ExecutionEngine`].
//!
//! The engine is treated as an opaque remote service: one request in, one
//! response out, no retries. Its failure modes map onto
//! [`kiln_core::EngineError`]; translation to HTTP statuses happens at the
//! API boundary, not here.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod client;

pub use client::{EngineConfig, HttpEngine};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
