// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Offline placeholder check
//!
//! Validates every full placeholder in a manifest without contacting the
//! config server. The absolute-name check covers embedded tokens too, as
//! interpolation does.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

use aegis_variables::application::manifest_tree::{collect_raw_names, collect_sites};
use aegis_variables::application::SubtreePath;
use aegis_variables::domain::variable_name::{extract_name, require_absolute};

#[derive(Args)]
pub struct CheckArgs {
    /// Manifest to check (YAML or JSON)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Reject relative variable names
    #[arg(long)]
    pub must_be_absolute: bool,

    /// Subtree to skip, dot separated with '*' for any index (e.g. "instance_groups.*.jobs")
    #[arg(long = "ignore", value_name = "PATH")]
    pub ignore: Vec<String>,
}

/// Outcome of checking one manifest.
#[derive(Debug, Default)]
pub(crate) struct CheckReport {
    pub names: Vec<String>,
    pub problems: Vec<String>,
}

pub(crate) fn check_manifest(
    manifest: &Value,
    ignored: &[SubtreePath],
    must_be_absolute: bool,
) -> CheckReport {
    let mut report = CheckReport::default();

    for site in collect_sites(manifest, ignored) {
        let location = site
            .path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match extract_name(&site.placeholder) {
            Ok(name) => report.names.push(name),
            Err(e) => report.problems.push(format!("{}: {}", location, e)),
        }
    }

    if must_be_absolute {
        if let Err(e) = require_absolute(&collect_raw_names(manifest, ignored)) {
            report.problems.push(e.to_string());
        }
    }

    report
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    let manifest = super::load_manifest(&args.manifest)?;
    let ignored: Vec<SubtreePath> = args.ignore.iter().map(|p| SubtreePath::parse(p)).collect();

    let report = check_manifest(&manifest, &ignored, args.must_be_absolute);

    if !report.problems.is_empty() {
        for problem in &report.problems {
            eprintln!("{} {}", "✗".red(), problem);
        }
        anyhow::bail!("{} placeholder problem(s) found", report.problems.len());
    }

    println!(
        "{}",
        format!("✓ {} placeholder(s) OK", report.names.len()).green()
    );
    Ok(())
}
