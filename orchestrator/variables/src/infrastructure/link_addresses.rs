// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Static Link Address Resolver
//
// In-process `LinkAddressResolver` backed by a table of known link targets.
// The orchestrator registers each consumed link's provider placement before
// generating certificates; tests and the CLI use it directly.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::declaration::{ConsumedLink, LinkAddressError, LinkAddressResolver};

pub const DEFAULT_ROOT_DOMAIN: &str = "bosh";

/// Placement of a link provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub instance_group: String,
    pub network: String,
    pub provider_deployment: String,
    /// DNS alias group used when link DNS names are enabled
    pub link_group: String,
}

pub struct StaticLinkAddressResolver {
    root_domain: String,
    /// Keyed by (consumer deployment, link name)
    targets: RwLock<HashMap<(String, String), LinkTarget>>,
}

impl StaticLinkAddressResolver {
    pub fn new(root_domain: impl Into<String>) -> Self {
        Self {
            root_domain: root_domain.into(),
            targets: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, deployment: impl Into<String>, link: impl Into<String>, target: LinkTarget) {
        self.targets
            .write()
            .insert((deployment.into(), link.into()), target);
    }
}

impl Default for StaticLinkAddressResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_DOMAIN)
    }
}

#[async_trait]
impl LinkAddressResolver for StaticLinkAddressResolver {
    async fn address(
        &self,
        variable: &str,
        deployment: &str,
        link: &ConsumedLink,
        use_link_dns_names: bool,
    ) -> Result<String, LinkAddressError> {
        let targets = self.targets.read();
        let target = targets
            .get(&(deployment.to_string(), link.from.clone()))
            .ok_or_else(|| LinkAddressError::UnknownLink {
                link: link.from.clone(),
                variable: variable.to_string(),
                deployment: deployment.to_string(),
            })?;

        let group = if use_link_dns_names {
            &target.link_group
        } else {
            &target.instance_group
        };

        Ok(format!(
            "q-s0.{}.{}.{}.{}",
            group, target.network, target.provider_deployment, self.root_domain
        ))
    }
}
