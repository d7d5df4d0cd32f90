// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Variable Declarations
//!
//! The `variables:` section of a deployment manifest: what to generate,
//! with which type and options, and which links a certificate consumes for
//! its DNS names.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Declaration types and the link addressing seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::variable::UpdateMode;

pub const CERTIFICATE_TYPE: &str = "certificate";

/// Consume kinds a certificate declaration may use.
pub const CONSUME_ALTERNATIVE_NAME: &str = "alternative_name";
pub const CONSUME_COMMON_NAME: &str = "common_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,

    #[serde(rename = "type")]
    pub variable_type: String,

    #[serde(default)]
    pub options: Map<String, Value>,

    /// Keyed by consume kind (`alternative_name`, `common_name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumes: Option<BTreeMap<String, ConsumedLink>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_mode: Option<UpdateMode>,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, variable_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variable_type: variable_type.into(),
            options: Map::new(),
            consumes: None,
            update_mode: None,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = Some(mode);
        self
    }

    pub fn consuming(mut self, kind: impl Into<String>, link: ConsumedLink) -> Self {
        self.consumes
            .get_or_insert_with(BTreeMap::new)
            .insert(kind.into(), link);
        self
    }

    pub fn is_certificate(&self) -> bool {
        self.variable_type == CERTIFICATE_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedLink {
    /// Name of the link the address is derived from
    pub from: String,

    #[serde(default)]
    pub properties: ConsumeProperties,
}

impl ConsumedLink {
    pub fn from_link(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            properties: ConsumeProperties::default(),
        }
    }

    pub fn wildcard(mut self) -> Self {
        self.properties.wildcard = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumeProperties {
    #[serde(default)]
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkAddressError {
    #[error("Link '{link}' consumed by variable '{variable}' could not be found in deployment '{deployment}'")]
    UnknownLink {
        link: String,
        variable: String,
        deployment: String,
    },

    #[error("Failed to resolve address for link '{0}': {1}")]
    Resolution(String, String),
}

/// Derives the DNS name of a link's provider instances.
#[async_trait]
pub trait LinkAddressResolver: Send + Sync {
    async fn address(
        &self,
        variable: &str,
        deployment: &str,
        link: &ConsumedLink,
        use_link_dns_names: bool,
    ) -> Result<String, LinkAddressError>;
}
