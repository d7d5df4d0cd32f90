// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fetch the latest value of one variable

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use aegis_variables::domain::variables_config::VariablesConfigManifest;
use aegis_variables::infrastructure::config_server::{build_transport, ConfigServerClient};

#[derive(Args)]
pub struct GetArgs {
    /// Fully qualified variable name (e.g. /aegis/orders/db_password)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Print the id alongside the value
    #[arg(long)]
    pub with_id: bool,
}

pub async fn execute(args: GetArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = VariablesConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    debug!(name = %args.name, url = %config.spec.config_server.url, "Fetching variable");
    let client = ConfigServerClient::new(build_transport(&config.spec)?);
    let variable = client.get_by_name(&args.name).await?;

    if args.with_id {
        println!("id: {}", variable.id);
    }
    println!("{}", serde_json::to_string_pretty(&variable.value)?);

    Ok(())
}
