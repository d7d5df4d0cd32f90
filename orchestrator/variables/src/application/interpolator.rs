// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Interpolator
//!
//! Replaces every `((name))` scalar of a manifest tree with the value stored
//! on the config server. Two flavors:
//!
//! - **versioned**: ids are pinned in a [`VariableSet`]. A name already in
//!   the set is fetched by id; a new name is fetched by name and recorded
//!   while the set is writable.
//! - **unversioned**: always the latest value, nothing is recorded.
//!
//! Failures to fetch are collected over the whole tree and reported as one
//! error with one `- Failed to …` line per failure, so every broken
//! placeholder shows up in a single pass.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Manifest interpolation against the config server

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::manifest_tree::{collect_raw_names, SubtreePath};
use crate::application::resolution::{fatal, resolve_tree, ResolveFailure, VariableFetcher};
use crate::application::variable_set_store::VariableSetStore;
use crate::domain::config_server::TransportError;
use crate::domain::variable::RequestContext;
use crate::domain::variable_name::{qualify, require_absolute, NameSyntaxError, RelativeNamesError};
use crate::domain::variable_set::{VariableSet, VariableSetError};
use crate::infrastructure::config_server::ConfigServerClient;

#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error(transparent)]
    NameSyntax(#[from] NameSyntaxError),

    #[error(transparent)]
    RelativeNames(#[from] RelativeNamesError),

    /// One entry per failed placeholder, in traversal order
    #[error("{}", render_failures(.failures))]
    Fetch { failures: Vec<String> },

    /// A frozen set lacks an association the caller relies on
    #[error("{0}")]
    InconsistentVariableState(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    VariableSet(#[from] VariableSetError),
}

fn render_failures(failures: &[String]) -> String {
    failures
        .iter()
        .map(|failure| format!("- {}", failure))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Default)]
pub struct InterpolationOptions {
    /// Reject relative names before any network call
    pub must_be_absolute: bool,
    pub ignored_subtrees: Vec<SubtreePath>,
    /// Namespace for relative names. Versioned calls default to the set's
    /// deployment; without one, relative names are looked up verbatim.
    pub deployment_name: Option<String>,
}

impl InterpolationOptions {
    pub fn for_deployment(deployment: impl Into<String>) -> Self {
        Self {
            deployment_name: Some(deployment.into()),
            ..Self::default()
        }
    }

    pub fn must_be_absolute(mut self) -> Self {
        self.must_be_absolute = true;
        self
    }

    pub fn ignoring(mut self, subtree: SubtreePath) -> Self {
        self.ignored_subtrees.push(subtree);
        self
    }
}

#[derive(Clone)]
pub struct Interpolator {
    client: ConfigServerClient,
    store: VariableSetStore,
    director_name: String,
}

impl Interpolator {
    pub fn new(
        client: ConfigServerClient,
        store: VariableSetStore,
        director_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            director_name: director_name.into(),
        }
    }

    /// Resolve against the latest stored values.
    pub async fn interpolate(
        &self,
        raw: &Value,
        options: &InterpolationOptions,
        request: &RequestContext,
    ) -> Result<Value, InterpolationError> {
        self.check_absolute(raw, options)?;
        debug!(actor = %request.actor, "Interpolating manifest (unversioned)");

        let qualifier = self.qualifier(options.deployment_name.clone());
        let fetcher = LatestFetcher {
            client: &self.client,
        };
        resolve_tree(raw, &options.ignored_subtrees, &qualifier, &fetcher).await
    }

    /// Resolve against the ids pinned in `set`, pinning new names while the
    /// set is writable.
    pub async fn interpolate_with_versioning(
        &self,
        raw: &Value,
        set: &VariableSet,
        options: &InterpolationOptions,
        request: &RequestContext,
    ) -> Result<Value, InterpolationError> {
        self.check_absolute(raw, options)?;
        debug!(
            actor = %request.actor,
            deployment = %set.deployment,
            set_id = %set.id,
            "Interpolating manifest"
        );

        let deployment = options
            .deployment_name
            .clone()
            .unwrap_or_else(|| set.deployment.clone());
        let qualifier = self.qualifier(Some(deployment));
        let fetcher = VersionedFetcher {
            client: &self.client,
            store: &self.store,
            set,
        };
        resolve_tree(raw, &options.ignored_subtrees, &qualifier, &fetcher).await
    }

    /// Whether interpolating `next_raw` against `next_set` yields a different
    /// tree than `prev_raw` against `prev_set`.
    pub async fn variables_changed(
        &self,
        prev_raw: &Value,
        prev_set: &VariableSet,
        next_raw: &Value,
        next_set: &VariableSet,
        options: &InterpolationOptions,
        request: &RequestContext,
    ) -> Result<bool, InterpolationError> {
        let (previous, next) = futures::try_join!(
            self.interpolate_with_versioning(prev_raw, prev_set, options, request),
            self.interpolate_with_versioning(next_raw, next_set, options, request),
        )?;

        let changed = previous != next;
        if changed {
            info!(
                deployment = %next_set.deployment,
                previous_set = %prev_set.id,
                next_set = %next_set.id,
                "Interpolated variables changed"
            );
        }
        Ok(changed)
    }

    fn check_absolute(&self, raw: &Value, options: &InterpolationOptions) -> Result<(), InterpolationError> {
        if options.must_be_absolute {
            require_absolute(&collect_raw_names(raw, &options.ignored_subtrees))?;
        }
        Ok(())
    }

    fn qualifier(&self, deployment: Option<String>) -> impl Fn(&str) -> String + Send + Sync {
        let director = self.director_name.clone();
        move |name: &str| match &deployment {
            Some(deployment) => qualify(name, &director, deployment),
            None => name.to_string(),
        }
    }
}

struct LatestFetcher<'a> {
    client: &'a ConfigServerClient,
}

#[async_trait]
impl VariableFetcher for LatestFetcher<'_> {
    async fn fetch(&self, name: &str) -> Result<Value, ResolveFailure> {
        Ok(self.client.get_by_name(name).await?.value)
    }
}

struct VersionedFetcher<'a> {
    client: &'a ConfigServerClient,
    store: &'a VariableSetStore,
    set: &'a VariableSet,
}

#[async_trait]
impl VariableFetcher for VersionedFetcher<'_> {
    async fn fetch(&self, name: &str) -> Result<Value, ResolveFailure> {
        if let Some(id) = self.store.find(name, self.set).await.map_err(fatal)? {
            return Ok(self.client.get_by_id(name, &id).await?.value);
        }

        if !self.set.writable {
            return Err(fatal(InterpolationError::InconsistentVariableState(format!(
                "Expected variable '{}' to be already versioned in deployment '{}'",
                name, self.set.deployment
            ))));
        }

        let latest = self.client.get_by_name(name).await?;
        let stored = self
            .store
            .add(name, &latest.id, self.set)
            .await
            .map_err(fatal)?;

        if stored == latest.id {
            Ok(latest.value)
        } else {
            Ok(self.client.get_by_id(name, &stored).await?.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_renders_one_line_per_failure() {
        let error = InterpolationError::Fetch {
            failures: vec!["Failed to find a".into(), "Failed to fetch b".into()],
        };
        assert_eq!(error.to_string(), "- Failed to find a\n- Failed to fetch b");
    }

    #[test]
    fn test_options_builders() {
        let options = InterpolationOptions::for_deployment("orders")
            .must_be_absolute()
            .ignoring(SubtreePath::new().key("addons"));
        assert!(options.must_be_absolute);
        assert_eq!(options.deployment_name.as_deref(), Some("orders"));
        assert_eq!(options.ignored_subtrees.len(), 1);
    }
}
