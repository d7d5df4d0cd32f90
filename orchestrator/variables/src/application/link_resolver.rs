// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cross-Deployment Link Resolver
//!
//! Link properties published by a provider deployment may contain
//! placeholders owned by the provider. A consumer resolves them against the
//! provider's pinned ids and copies each binding into its own variable set,
//! so a later consumer redeploy reads the same version even after the
//! provider has moved on.
//!
//! Resolution order for each base name:
//!
//! 1. consumer set already holds it: fetch by that id
//! 2. consumer set is frozen: fatal
//! 3. provider set holds it: copy into the consumer set, fetch by id
//! 4. otherwise: fatal

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::application::interpolator::{InterpolationError, InterpolationOptions};
use crate::application::resolution::{fatal, resolve_tree, ResolveFailure, VariableFetcher};
use crate::application::variable_set_store::VariableSetStore;
use crate::domain::variable::RequestContext;
use crate::domain::variable_name::qualify;
use crate::domain::variable_set::VariableSet;
use crate::infrastructure::config_server::ConfigServerClient;

#[derive(Clone)]
pub struct LinkResolver {
    client: ConfigServerClient,
    store: VariableSetStore,
    director_name: String,
}

impl LinkResolver {
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

    /// Resolve `link_properties` for `consumer_set`. Relative names belong to
    /// the provider deployment.
    pub async fn resolve_link_properties(
        &self,
        link_properties: &Value,
        consumer_set: &VariableSet,
        provider_set: &VariableSet,
        options: &InterpolationOptions,
        request: &RequestContext,
    ) -> Result<Value, InterpolationError> {
        debug!(
            actor = %request.actor,
            consumer = %consumer_set.deployment,
            provider = %provider_set.deployment,
            "Resolving link properties"
        );

        let director = self.director_name.clone();
        let provider = provider_set.deployment.clone();
        let qualifier = move |name: &str| qualify(name, &director, &provider);

        let fetcher = LinkFetcher {
            client: &self.client,
            store: &self.store,
            consumer: consumer_set,
            provider: provider_set,
        };
        resolve_tree(link_properties, &options.ignored_subtrees, &qualifier, &fetcher).await
    }
}

struct LinkFetcher<'a> {
    client: &'a ConfigServerClient,
    store: &'a VariableSetStore,
    consumer: &'a VariableSet,
    provider: &'a VariableSet,
}

#[async_trait]
impl VariableFetcher for LinkFetcher<'_> {
    async fn fetch(&self, name: &str) -> Result<Value, ResolveFailure> {
        if let Some(id) = self.store.find(name, self.consumer).await.map_err(fatal)? {
            return Ok(self.client.get_by_id(name, &id).await?.value);
        }

        if !self.consumer.writable {
            return Err(fatal(InterpolationError::InconsistentVariableState(format!(
                "Variable '{}' must already be versioned in deployment '{}'",
                name, self.consumer.deployment
            ))));
        }

        let provider_id = self
            .store
            .find(name, self.provider)
            .await
            .map_err(fatal)?
            .ok_or_else(|| {
                fatal(InterpolationError::InconsistentVariableState(format!(
                    "Variable '{}' must be already versioned in link provider deployment '{}'",
                    name, self.provider.deployment
                )))
            })?;

        let stored = self
            .store
            .add_link(name, &provider_id, &self.provider.deployment, self.consumer)
            .await
            .map_err(fatal)?;

        Ok(self.client.get_by_id(name, &stored).await?.value)
    }
}
