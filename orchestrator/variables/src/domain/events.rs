// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::variable::{RequestContext, UpdateMode, VariableId};

/// Audit record for a variable creation, consumed by the eventing subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEvent {
    pub user: String,
    pub action: String,
    pub object_type: String,
    pub object_name: String,
    pub task: Option<String>,
    pub deployment: String,
    pub instance: Option<String>,
    pub context: Value,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VariableEvent {
    fn base(request: &RequestContext, deployment: &str, name: &str, context: Value) -> Self {
        Self {
            user: request.actor.clone(),
            action: "create".to_string(),
            object_type: "variable".to_string(),
            object_name: name.to_string(),
            task: request.task_id.clone(),
            deployment: deployment.to_string(),
            instance: None,
            context,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A value was generated, or an earlier id was reused for this deploy.
    pub fn variable_created(
        request: &RequestContext,
        deployment: &str,
        name: &str,
        id: &VariableId,
        update_strategy: UpdateMode,
        latest_version: bool,
    ) -> Self {
        Self::base(
            request,
            deployment,
            name,
            json!({
                "id": id.as_str(),
                "name": name,
                "update_strategy": update_strategy.as_str(),
                "latest_version": latest_version,
            }),
        )
    }

    pub fn variable_failed(
        request: &RequestContext,
        deployment: &str,
        name: &str,
        update_strategy: UpdateMode,
        error: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(
            request,
            deployment,
            name,
            json!({
                "name": name,
                "update_strategy": update_strategy.as_str(),
            }),
        );
        event.error = Some(error.into());
        event
    }

    pub fn latest_version(&self) -> Option<bool> {
        self.context.get("latest_version").and_then(Value::as_bool)
    }

    pub fn variable_id(&self) -> Option<&str> {
        self.context.get("id").and_then(Value::as_str)
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to deliver audit event: {0}")]
    Delivery(String),
}

/// Append-only destination for audit records. Callers log and continue on
/// failure; an audit outage never fails a deploy.
#[async_trait]
pub trait AuditEventSink: Send + Sync {
    async fn record(&self, event: VariableEvent) -> Result<(), AuditError>;
}
