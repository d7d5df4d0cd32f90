// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AEGIS Deployment Variables CLI
//!
//! The `aegis-vars` binary drives the variable resolution engine from the
//! command line: configuration checks, placeholder syntax checks, value
//! lookups and unversioned manifest interpolation against the config server.
//!
//! ## Commands
//!
//! - `aegis-vars config show|validate|generate` - Configuration management
//! - `aegis-vars check <MANIFEST>` - Placeholder syntax check (no network)
//! - `aegis-vars get <NAME>` - Latest value of a variable
//! - `aegis-vars interpolate <MANIFEST>` - Resolve placeholders, print YAML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{CheckArgs, ConfigCommand, GetArgs, InterpolateArgs};

/// AEGIS deployment variables - resolve and check config server placeholders
#[derive(Parser)]
#[command(name = "aegis-vars")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AEGIS_VARIABLES_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AEGIS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Check placeholder syntax of a manifest
    #[command(name = "check")]
    Check(CheckArgs),

    /// Fetch the latest value of a variable
    #[command(name = "get")]
    Get(GetArgs),

    /// Interpolate a manifest against latest values
    #[command(name = "interpolate")]
    Interpolate(InterpolateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Check(args) => commands::check::execute(args).await,
        Commands::Get(args) => commands::get::execute(args, cli.config).await,
        Commands::Interpolate(args) => commands::interpolate::execute(args, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
