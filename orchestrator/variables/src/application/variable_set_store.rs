// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Variable Set Store
//!
//! Application service over [`VariableSetRepository`] that owns the
//! generation lifecycle of a deployment's name → id ledger and makes every
//! association write race tolerant: when two workers resolve the same
//! placeholder concurrently, the repository's uniqueness constraint rejects
//! the loser and the store answers with the winner's id instead.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Versioned name → id ledger per deployment generation

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::repository::{RepositoryError, VariableSetRepository};
use crate::domain::variable::VariableId;
use crate::domain::variable_set::{
    VariableAssociation, VariableSet, VariableSetError, VariableSetId,
};

#[derive(Clone)]
pub struct VariableSetStore {
    repository: Arc<dyn VariableSetRepository>,
}

impl VariableSetStore {
    pub fn new(repository: Arc<dyn VariableSetRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn VariableSetRepository> {
        &self.repository
    }

    /// Id associated with `name` in `set`, if any.
    pub async fn find(
        &self,
        name: &str,
        set: &VariableSet,
    ) -> Result<Option<VariableId>, VariableSetError> {
        Ok(self.repository.find_variable_id(set.id, name).await?)
    }

    /// Record `name → id` in a writable set, returning the id that ended up
    /// stored.
    pub async fn add(
        &self,
        name: &str,
        id: &VariableId,
        set: &VariableSet,
    ) -> Result<VariableId, VariableSetError> {
        self.insert(set, VariableAssociation::local(set.id, name, id.clone()))
            .await
    }

    /// Record a binding copied from `provider_deployment`.
    pub async fn add_link(
        &self,
        name: &str,
        id: &VariableId,
        provider_deployment: &str,
        set: &VariableSet,
    ) -> Result<VariableId, VariableSetError> {
        self.insert(
            set,
            VariableAssociation::link(set.id, name, id.clone(), provider_deployment),
        )
        .await
    }

    async fn insert(
        &self,
        set: &VariableSet,
        association: VariableAssociation,
    ) -> Result<VariableId, VariableSetError> {
        if !set.writable {
            return Err(VariableSetError::FrozenSet {
                set_id: set.id,
                deployment: set.deployment.clone(),
                name: association.variable_name,
            });
        }

        match self.repository.insert_association(&association).await {
            Ok(()) => {
                debug!(
                    variable = %association.variable_name,
                    id = %association.variable_id,
                    set_id = %set.id,
                    "Associated variable with set"
                );
                Ok(association.variable_id)
            }
            Err(RepositoryError::UniqueViolation(_)) => {
                let winner = self
                    .repository
                    .find_variable_id(set.id, &association.variable_name)
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::NotFound(format!(
                            "variable '{}' in set {}",
                            association.variable_name, set.id
                        ))
                    })?;

                if winner != association.variable_id {
                    warn!(
                        variable = %association.variable_name,
                        attempted = %association.variable_id,
                        stored = %winner,
                        set_id = %set.id,
                        "Lost race recording variable, using stored id"
                    );
                }
                Ok(winner)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Start a new generation for `deployment`, freezing the previous
    /// writable one (recorded as not deployed successfully).
    pub async fn create_writable(&self, deployment: &str) -> Result<VariableSet, VariableSetError> {
        for mut set in self.repository.find_sets_by_deployment(deployment).await? {
            if set.writable {
                set.freeze(false);
                self.repository.save_set(&set).await?;
                info!(deployment, set_id = %set.id, "Froze abandoned writable variable set");
            }
        }

        let set = VariableSet::new_writable(deployment);
        self.repository.save_set(&set).await?;
        info!(deployment, set_id = %set.id, "Created writable variable set");
        Ok(set)
    }

    /// Newest generation of `deployment`.
    pub async fn current(&self, deployment: &str) -> Result<Option<VariableSet>, VariableSetError> {
        Ok(self
            .repository
            .find_sets_by_deployment(deployment)
            .await?
            .into_iter()
            .next())
    }

    pub async fn get(&self, id: VariableSetId) -> Result<VariableSet, VariableSetError> {
        self.repository
            .find_set(id)
            .await?
            .ok_or(VariableSetError::NotFound(id))
    }

    /// Freeze `set` once its deploy attempt is over.
    pub async fn freeze(
        &self,
        set: &VariableSet,
        deployed_successfully: bool,
    ) -> Result<VariableSet, VariableSetError> {
        let mut frozen = set.clone();
        frozen.freeze(deployed_successfully);
        self.repository.save_set(&frozen).await?;
        info!(
            deployment = %frozen.deployment,
            set_id = %frozen.id,
            deployed_successfully,
            "Froze variable set"
        );
        Ok(frozen)
    }

    /// Id of `name` in the most recent successfully deployed generation
    /// older than `set`.
    pub async fn previous_variable_id(
        &self,
        name: &str,
        set: &VariableSet,
    ) -> Result<Option<VariableId>, VariableSetError> {
        let history = self.repository.find_sets_by_deployment(&set.deployment).await?;

        for previous in history
            .iter()
            .skip_while(|candidate| candidate.id != set.id)
            .skip(1)
            .filter(|candidate| candidate.deployed_successfully)
        {
            if let Some(id) = self.repository.find_variable_id(previous.id, name).await? {
                return Ok(Some(id));
            }
        }

        Ok(None)
    }

    pub async fn associations(
        &self,
        set: &VariableSet,
    ) -> Result<Vec<VariableAssociation>, VariableSetError> {
        Ok(self.repository.find_associations(set.id).await?)
    }
}
