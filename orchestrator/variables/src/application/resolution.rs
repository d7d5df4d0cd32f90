// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Placeholder Resolution
//
// Shared by the interpolator and the link resolver. Resolution is two-phase:
// every placeholder name is validated before the first network call, then
// sites are resolved in traversal order with one fetch per base name.
// Reportable failures are collected; the substituted copy is only produced
// when none occurred.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::application::interpolator::InterpolationError;
use crate::application::manifest_tree::{collect_sites, replace_at, PathSegment, SubtreePath};
use crate::domain::config_server::ConfigServerError;
use crate::domain::variable_name::PlaceholderName;

pub(crate) enum ResolveFailure {
    /// Collected into the aggregated error
    Reported(String),
    /// Aborts the whole call
    Fatal(InterpolationError),
}

impl From<ConfigServerError> for ResolveFailure {
    fn from(err: ConfigServerError) -> Self {
        match err {
            ConfigServerError::Transport(e) => ResolveFailure::Fatal(InterpolationError::Transport(e)),
            other => ResolveFailure::Reported(other.to_string()),
        }
    }
}

/// Abort resolution with `err`.
pub(crate) fn fatal(err: impl Into<InterpolationError>) -> ResolveFailure {
    ResolveFailure::Fatal(err.into())
}

/// Produces the value stored under a fully-qualified base name.
#[async_trait]
pub(crate) trait VariableFetcher: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Value, ResolveFailure>;
}

/// Resolve every full placeholder of `tree`, returning a substituted copy.
pub(crate) async fn resolve_tree(
    tree: &Value,
    ignored: &[SubtreePath],
    qualify: &(dyn Fn(&str) -> String + Send + Sync),
    fetcher: &dyn VariableFetcher,
) -> Result<Value, InterpolationError> {
    let sites = collect_sites(tree, ignored);

    let mut parsed = Vec::with_capacity(sites.len());
    for site in &sites {
        parsed.push(PlaceholderName::from_placeholder(&site.placeholder)?);
    }

    let mut fetched: HashMap<String, Option<Value>> = HashMap::new();
    let mut failures: Vec<String> = Vec::new();
    let mut substitutions: Vec<(&[PathSegment], Value)> = Vec::new();

    for (site, name) in sites.iter().zip(&parsed) {
        let base = qualify(&name.base);

        if !fetched.contains_key(&base) {
            debug!(variable = %base, "Resolving placeholder");
            let outcome = match fetcher.fetch(&base).await {
                Ok(value) => Some(value),
                Err(ResolveFailure::Reported(message)) => {
                    failures.push(message);
                    None
                }
                Err(ResolveFailure::Fatal(e)) => return Err(e),
            };
            fetched.insert(base.clone(), outcome);
        }

        // A base that already failed was reported once
        let Some(Some(value)) = fetched.get(&base) else {
            continue;
        };

        match descend(value, &base, &name.keys) {
            Ok(resolved) => substitutions.push((site.path.as_slice(), resolved.clone())),
            Err(message) => failures.push(message),
        }
    }

    if !failures.is_empty() {
        return Err(InterpolationError::Fetch { failures });
    }

    let mut result = tree.clone();
    for (path, value) in substitutions {
        replace_at(&mut result, path, value);
    }
    Ok(result)
}

/// Follow the dot-path `keys` into a fetched value.
fn descend<'v>(value: &'v Value, base: &str, keys: &[String]) -> Result<&'v Value, String> {
    let mut node = value;
    let mut parent = base.to_string();

    for key in keys {
        node = node.get(key.as_str()).ok_or_else(|| {
            format!(
                "Failed to fetch variable '{}' from config server: Expected parent '{}' hash to have key '{}'",
                base, parent, key
            )
        })?;
        parent.push('.');
        parent.push_str(key);
    }

    Ok(node)
}
