// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for the variable-set ledger, following the DDD
//! Repository pattern: interface defined in the domain layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `VariableSetRepository` | `VariableSet` + associations | `InMemoryVariableSetRepository`, `PostgresVariableSetRepository` |
//!
//! ## Uniqueness
//!
//! Implementations must reject a second association for the same
//! `(variable_set_id, variable_name)` pair with
//! [`RepositoryError::UniqueViolation`]. Concurrent resolution of one
//! placeholder converges on that rejection, see
//! `crate::application::variable_set_store`.

use async_trait::async_trait;

use crate::domain::variable::VariableId;
use crate::domain::variable_set::{VariableAssociation, VariableSet, VariableSetId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

#[async_trait]
pub trait VariableSetRepository: Send + Sync {
    /// Save set (create or update writable/deployed flags)
    async fn save_set(&self, set: &VariableSet) -> Result<(), RepositoryError>;

    async fn find_set(&self, id: VariableSetId) -> Result<Option<VariableSet>, RepositoryError>;

    /// All generations of a deployment, newest first
    async fn find_sets_by_deployment(
        &self,
        deployment: &str,
    ) -> Result<Vec<VariableSet>, RepositoryError>;

    async fn find_variable_id(
        &self,
        set_id: VariableSetId,
        name: &str,
    ) -> Result<Option<VariableId>, RepositoryError>;

    /// Insert an association, failing with `UniqueViolation` if the set
    /// already holds one for the same name
    async fn insert_association(
        &self,
        association: &VariableAssociation,
    ) -> Result<(), RepositoryError>;

    async fn find_associations(
        &self,
        set_id: VariableSetId,
    ) -> Result<Vec<VariableAssociation>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::UniqueViolation(db_err.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
