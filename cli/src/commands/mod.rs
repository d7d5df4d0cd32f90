// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the AEGIS variables CLI

pub mod check;
pub mod config;
pub mod get;
pub mod interpolate;

pub use self::check::CheckArgs;
pub use self::config::ConfigCommand;
pub use self::get::GetArgs;
pub use self::interpolate::InterpolateArgs;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Read a YAML (or JSON) manifest into a tree, keeping key order.
pub(crate) fn load_manifest(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse manifest {:?}", path))
}
