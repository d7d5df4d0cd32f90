// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the variable-set ledger defined in
//! `crate::domain::repository`, following the Repository pattern from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve variable sets and their associations
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **PostgresVariableSetRepository** - `variable_sets` / `variables` tables
//! - **InMemoryVariableSetRepository** - lock-guarded maps for tests and development
//!
//! Both enforce one association per `(variable_set_id, variable_name)`.

pub mod postgres_variable_set;

pub use postgres_variable_set::PostgresVariableSetRepository;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::repository::{
    PostgresConfig, RepositoryError, StorageBackend, VariableSetRepository,
};
use crate::domain::variable::VariableId;
use crate::domain::variable_set::{VariableAssociation, VariableSet, VariableSetId};
use crate::infrastructure::db::Database;

#[derive(Default)]
struct Ledger {
    sets: HashMap<VariableSetId, VariableSet>,
    /// Set ids in creation order
    order: Vec<VariableSetId>,
    associations: HashMap<VariableSetId, Vec<VariableAssociation>>,
}

#[derive(Clone, Default)]
pub struct InMemoryVariableSetRepository {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryVariableSetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VariableSetRepository for InMemoryVariableSetRepository {
    async fn save_set(&self, set: &VariableSet) -> Result<(), RepositoryError> {
        let mut ledger = self.ledger.write();
        if ledger.sets.insert(set.id, set.clone()).is_none() {
            ledger.order.push(set.id);
        }
        Ok(())
    }

    async fn find_set(&self, id: VariableSetId) -> Result<Option<VariableSet>, RepositoryError> {
        Ok(self.ledger.read().sets.get(&id).cloned())
    }

    async fn find_sets_by_deployment(
        &self,
        deployment: &str,
    ) -> Result<Vec<VariableSet>, RepositoryError> {
        let ledger = self.ledger.read();
        Ok(ledger
            .order
            .iter()
            .rev()
            .filter_map(|id| ledger.sets.get(id))
            .filter(|set| set.deployment == deployment)
            .cloned()
            .collect())
    }

    async fn find_variable_id(
        &self,
        set_id: VariableSetId,
        name: &str,
    ) -> Result<Option<VariableId>, RepositoryError> {
        let ledger = self.ledger.read();
        Ok(ledger.associations.get(&set_id).and_then(|rows| {
            rows.iter()
                .find(|row| row.variable_name == name)
                .map(|row| row.variable_id.clone())
        }))
    }

    async fn insert_association(
        &self,
        association: &VariableAssociation,
    ) -> Result<(), RepositoryError> {
        let mut ledger = self.ledger.write();
        if !ledger.sets.contains_key(&association.variable_set_id) {
            return Err(RepositoryError::NotFound(format!(
                "variable set {}",
                association.variable_set_id
            )));
        }

        let rows = ledger
            .associations
            .entry(association.variable_set_id)
            .or_default();
        if rows
            .iter()
            .any(|row| row.variable_name == association.variable_name)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "variable '{}' already associated with set {}",
                association.variable_name, association.variable_set_id
            )));
        }

        rows.push(association.clone());
        Ok(())
    }

    async fn find_associations(
        &self,
        set_id: VariableSetId,
    ) -> Result<Vec<VariableAssociation>, RepositoryError> {
        Ok(self
            .ledger
            .read()
            .associations
            .get(&set_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Build the ledger repository for the configured storage backend.
pub async fn create_variable_set_repository(
    backend: &StorageBackend,
) -> anyhow::Result<Arc<dyn VariableSetRepository>> {
    match backend {
        StorageBackend::InMemory => {
            tracing::info!("Using in-memory variable set repository");
            Ok(Arc::new(InMemoryVariableSetRepository::new()))
        }
        StorageBackend::PostgreSQL(PostgresConfig { connection_string }) => {
            let database = Database::new(connection_string).await?;
            database.migrate().await?;
            tracing::info!("Using PostgreSQL variable set repository");
            Ok(Arc::new(PostgresVariableSetRepository::new_with_pool(
                database.get_pool().clone(),
            )))
        }
    }
}
