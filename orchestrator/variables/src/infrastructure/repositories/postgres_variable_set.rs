// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::{RepositoryError, VariableSetRepository};
use crate::domain::variable::VariableId;
use crate::domain::variable_set::{VariableAssociation, VariableSet, VariableSetId};

pub struct PostgresVariableSetRepository {
    pool: PgPool,
}

impl PostgresVariableSetRepository {
    pub fn new_with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn set_from_row(row: &sqlx::postgres::PgRow) -> Result<VariableSet, RepositoryError> {
        let id: Uuid = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        Ok(VariableSet {
            id: VariableSetId(id),
            deployment: row.try_get("deployment_name")?,
            writable: row.try_get("writable")?,
            deployed_successfully: row.try_get("deployed_successfully")?,
            created_at,
        })
    }
}

#[async_trait]
impl VariableSetRepository for PostgresVariableSetRepository {
    async fn save_set(&self, set: &VariableSet) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO variable_sets (id, deployment_name, writable, deployed_successfully, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                writable = EXCLUDED.writable,
                deployed_successfully = EXCLUDED.deployed_successfully
            "#,
        )
        .bind(set.id.0)
        .bind(&set.deployment)
        .bind(set.writable)
        .bind(set.deployed_successfully)
        .bind(set.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_set(&self, id: VariableSetId) -> Result<Option<VariableSet>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, deployment_name, writable, deployed_successfully, created_at
            FROM variable_sets
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::set_from_row).transpose()
    }

    async fn find_sets_by_deployment(
        &self,
        deployment: &str,
    ) -> Result<Vec<VariableSet>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, deployment_name, writable, deployed_successfully, created_at
            FROM variable_sets
            WHERE deployment_name = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(deployment)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::set_from_row).collect()
    }

    async fn find_variable_id(
        &self,
        set_id: VariableSetId,
        name: &str,
    ) -> Result<Option<VariableId>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT variable_id
            FROM variables
            WHERE variable_set_id = $1 AND variable_name = $2
            "#,
        )
        .bind(set_id.0)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(VariableId(row.try_get("variable_id")?))),
            None => Ok(None),
        }
    }

    async fn insert_association(
        &self,
        association: &VariableAssociation,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO variables (variable_set_id, variable_name, variable_id, is_local, provider_deployment)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(association.variable_set_id.0)
        .bind(&association.variable_name)
        .bind(association.variable_id.as_str())
        .bind(association.is_local)
        .bind(&association.provider_deployment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_associations(
        &self,
        set_id: VariableSetId,
    ) -> Result<Vec<VariableAssociation>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT variable_set_id, variable_name, variable_id, is_local, provider_deployment
            FROM variables
            WHERE variable_set_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(set_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<VariableAssociation, RepositoryError> {
                let set_id: Uuid = row.try_get("variable_set_id")?;
                Ok(VariableAssociation {
                    variable_set_id: VariableSetId(set_id),
                    variable_name: row.try_get("variable_name")?,
                    variable_id: VariableId(row.try_get("variable_id")?),
                    is_local: row.try_get("is_local")?,
                    provider_deployment: row.try_get("provider_deployment")?,
                })
            })
            .collect()
    }
}
