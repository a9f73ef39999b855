// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared fixtures, mocks, and the in-process harness for integration
//! tests.
//!
//! - `fixtures`: Pre-built configurations and sample data
//! - `mocks`: Mock implementations for testing
//! - `harness`: Drives the real router end to end, in process

pub mod fixtures;
pub mod harness;
pub mod mocks;

// Re-exports for convenience
pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test module.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,kiln=debug")),
            )
            .with_test_writer()
            .init();
    });
}
