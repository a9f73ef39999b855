// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command to start the server.
pub async fn run(_cli: &Cli, args: RunArgs) -> BinResult<()> {
    info!("Starting Kiln server...");

    let runtime = RuntimeBuilder::new().port(args.port).build()?;

    runtime.run().await
}
