// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Kiln - code execution backend
//!
//! Main binary entry point for the Kiln server.

use kiln_bin::{cli::Cli, commands, error, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    logging::init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(e) = commands::execute(cli).await {
        error::report_error_and_exit(e);
    }
}
