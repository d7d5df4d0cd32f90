// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Variable Set Aggregate
//!
//! A variable set is one generation of a deployment's resolved
//! name → variable-id associations. Every deploy attempt works against a
//! fresh writable set; once the attempt finishes the set is frozen and
//! becomes an immutable snapshot that later deploys can compare against or
//! reuse ids from.
//!
//! ## Invariants
//!
//! - At most one writable set per deployment.
//! - Associations are only ever added to a writable set.
//! - An association never changes once written; a new value is a new id
//!   recorded in a newer set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::repository::RepositoryError;
use crate::domain::variable::VariableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableSetId(pub Uuid);

impl VariableSetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for VariableSetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VariableSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSet {
    pub id: VariableSetId,
    pub deployment: String,
    pub writable: bool,
    pub deployed_successfully: bool,
    pub created_at: DateTime<Utc>,
}

impl VariableSet {
    /// Start a new generation for a deploy attempt.
    pub fn new_writable(deployment: impl Into<String>) -> Self {
        Self {
            id: VariableSetId::new(),
            deployment: deployment.into(),
            writable: true,
            deployed_successfully: false,
            created_at: Utc::now(),
        }
    }

    pub fn freeze(&mut self, deployed_successfully: bool) {
        self.writable = false;
        self.deployed_successfully = deployed_successfully;
    }
}

/// One ledger row: `name` resolved to `variable_id` within a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableAssociation {
    pub variable_set_id: VariableSetId,
    pub variable_name: String,
    pub variable_id: VariableId,
    /// False when the value belongs to a link provider deployment
    pub is_local: bool,
    pub provider_deployment: Option<String>,
}

impl VariableAssociation {
    pub fn local(set_id: VariableSetId, name: impl Into<String>, id: VariableId) -> Self {
        Self {
            variable_set_id: set_id,
            variable_name: name.into(),
            variable_id: id,
            is_local: true,
            provider_deployment: None,
        }
    }

    pub fn link(
        set_id: VariableSetId,
        name: impl Into<String>,
        id: VariableId,
        provider_deployment: impl Into<String>,
    ) -> Self {
        Self {
            variable_set_id: set_id,
            variable_name: name.into(),
            variable_id: id,
            is_local: false,
            provider_deployment: Some(provider_deployment.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum VariableSetError {
    /// Writing to a frozen generation means the caller lost track of which
    /// set is current. Never recoverable.
    #[error("Variable set '{set_id}' of deployment '{deployment}' is frozen, cannot add variable '{name}'")]
    FrozenSet {
        set_id: VariableSetId,
        deployment: String,
        name: String,
    },

    #[error("Variable set '{0}' not found")]
    NotFound(VariableSetId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
