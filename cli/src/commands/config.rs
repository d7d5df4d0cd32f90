// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use aegis_variables::domain::variables_config::{AuthSettings, VariablesConfigManifest};

const SAMPLE_CONFIG: &str = include_str!("../../templates/variables-config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./aegis-variables.yaml)
        #[arg(short, long, default_value = "./aegis-variables.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = VariablesConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. AEGIS_VARIABLES_CONFIG_PATH: {}",
            std::env::var("AEGIS_VARIABLES_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./aegis-variables.yaml");
        println!("  4. ~/.aegis/variables.yaml");
        println!("  5. /etc/aegis/variables.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Director:".bold());
    println!("  Name: {}", config.spec.director_name);
    println!("  Config: {}", config.metadata.name);
    println!();

    let server = &config.spec.config_server;
    println!("{}", "Config Server:".bold());
    println!("  URL: {}", server.url);
    match &server.ca_cert_path {
        Some(path) => println!("  CA bundle: {}", path.display()),
        None => println!("  CA bundle: {}", "(platform roots)".dimmed()),
    }
    println!("  Timeout: {}s", server.timeout_secs);
    println!(
        "  Retry: {} attempts, {}ms backoff",
        server.retry.max_attempts, server.retry.backoff_ms
    );
    println!();

    // Secrets are never printed
    println!("{}", "Authentication:".bold());
    match &config.spec.auth {
        AuthSettings::None => println!("  Type: none"),
        AuthSettings::Static { .. } => println!("  Type: static token"),
        AuthSettings::ClientCredentials {
            token_url,
            client_id,
            ..
        } => {
            println!("  Type: client credentials");
            println!("  Token URL: {}", token_url);
            println!("  Client: {}", client_id);
        }
    }
    println!();

    println!("{}", "Ledger:".bold());
    match &config.spec.database {
        Some(_) => println!("  Storage: PostgreSQL"),
        None => println!("  Storage: in-memory"),
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = VariablesConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    std::fs::write(&output, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
