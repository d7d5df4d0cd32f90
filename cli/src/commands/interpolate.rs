// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Manifest interpolation
//!
//! Resolves placeholders against the config server and prints the result as
//! YAML. By default the latest values are used and nothing is recorded.
//! With `--pin` the ids are pinned in the deployment's writable variable set
//! in the configured ledger (`spec.database`), so later runs against the
//! same set read the same versions.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use aegis_variables::application::{InterpolationOptions, Interpolator, SubtreePath, VariableSetStore};
use aegis_variables::domain::variable::RequestContext;
use aegis_variables::domain::variables_config::VariablesConfigManifest;
use aegis_variables::infrastructure::config_server::{build_transport, ConfigServerClient};
use aegis_variables::infrastructure::repositories::{
    create_variable_set_repository, InMemoryVariableSetRepository,
};

#[derive(Args)]
pub struct InterpolateArgs {
    /// Manifest to interpolate (YAML or JSON)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Deployment that relative names belong to
    #[arg(short, long)]
    pub deployment: Option<String>,

    /// Pin resolved ids in the deployment's writable variable set
    #[arg(long, requires = "deployment")]
    pub pin: bool,

    /// Reject relative variable names
    #[arg(long)]
    pub must_be_absolute: bool,

    /// Subtree to leave untouched, dot separated with '*' for any index
    #[arg(long = "ignore", value_name = "PATH")]
    pub ignore: Vec<String>,

    /// Actor recorded in logs
    #[arg(long, env = "USER", default_value = "cli")]
    pub actor: String,
}

impl InterpolateArgs {
    fn options(&self) -> InterpolationOptions {
        let mut options = InterpolationOptions {
            deployment_name: self.deployment.clone(),
            ..InterpolationOptions::default()
        };
        if self.must_be_absolute {
            options = options.must_be_absolute();
        }
        for pattern in &self.ignore {
            options = options.ignoring(SubtreePath::parse(pattern));
        }
        options
    }
}

pub async fn execute(args: InterpolateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = VariablesConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let resolved = resolve(&args, &config).await?;

    print!("{}", serde_yaml::to_string(&resolved)?);
    Ok(())
}

pub(crate) async fn resolve(args: &InterpolateArgs, config: &VariablesConfigManifest) -> Result<Value> {
    let manifest = super::load_manifest(&args.manifest)?;
    debug!(manifest = ?args.manifest, director = %config.spec.director_name, "Interpolating manifest");

    let client = ConfigServerClient::new(build_transport(&config.spec)?);
    let director = config.spec.director_name.clone();
    let request = RequestContext::new(args.actor.clone());
    let options = args.options();

    let resolved = match args.deployment.as_deref().filter(|_| args.pin) {
        Some(deployment) => {
            let repository = create_variable_set_repository(&config.storage_backend()?).await?;
            let store = VariableSetStore::new(repository);
            let set = match store.current(deployment).await? {
                Some(set) if set.writable => set,
                _ => store.create_writable(deployment).await?,
            };
            info!(deployment = %deployment, set_id = %set.id, "Pinning variables");

            Interpolator::new(client, store, director)
                .interpolate_with_versioning(&manifest, &set, &options, &request)
                .await?
        }
        None => {
            let store = VariableSetStore::new(Arc::new(InMemoryVariableSetRepository::new()));
            Interpolator::new(client, store, director)
                .interpolate(&manifest, &options, &request)
                .await?
        }
    };

    Ok(resolved)
}
