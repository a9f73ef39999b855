// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use kiln_api::ApiConfig;

use crate::cli::{Cli, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::engine_config_from_env;

/// Executes the `validate` command: loads the configuration from the
/// environment, validates it, and reports the result without starting the
/// server.
pub fn validate(_cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config = ApiConfig::from_env()
        .map_err(|e| BinError::config(format!("Failed to load configuration: {}", e)))?;

    config
        .validate()
        .map_err(|e| BinError::config(e.to_string()))?;

    let engine_config = engine_config_from_env()?;

    println!("Configuration is valid");
    println!("  listen:  {}", config.socket_addr());
    println!("  env:     {:?}", config.environment);
    println!("  engine:  {}", engine_config.base_url);

    if args.show_config {
        // Signing secrets are skipped by serialization and cannot leak here.
        let rendered = serde_json::to_string_pretty(&config)
            .map_err(|e| BinError::config(format!("Failed to render configuration: {}", e)))?;
        println!("\n{}", rendered);
    }

    Ok(())
}
