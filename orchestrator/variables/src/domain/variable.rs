// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Value Objects
// ============================================================================

/// Opaque identifier assigned by the config server to one stored value.
///
/// A new value for the same name always gets a new id, so an id pins an
/// exact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub String);

impl VariableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored version of a named secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub value: Value,
}

/// Overwrite policy applied when generating a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMode {
    #[default]
    NoOverwrite,
    Overwrite,
    Converge,
    OnStemcellChange,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::NoOverwrite => "no-overwrite",
            UpdateMode::Overwrite => "overwrite",
            UpdateMode::Converge => "converge",
            UpdateMode::OnStemcellChange => "on-stemcell-change",
        }
    }
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a generation call against the config server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub variable_type: String,
    pub parameters: Value,
    pub mode: UpdateMode,
}

/// Who is asking, passed explicitly into every resolution and generation
/// call so audit records are attributed without ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub actor: String,
    pub task_id: Option<String>,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            task_id: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_mode_wire_names() {
        assert_eq!(serde_json::to_value(UpdateMode::NoOverwrite).unwrap(), "no-overwrite");
        assert_eq!(
            serde_json::from_str::<UpdateMode>("\"on-stemcell-change\"").unwrap(),
            UpdateMode::OnStemcellChange
        );
        assert_eq!(UpdateMode::Converge.to_string(), "converge");
    }

    #[test]
    fn test_update_mode_defaults_to_no_overwrite() {
        assert_eq!(UpdateMode::default(), UpdateMode::NoOverwrite);
    }

    #[test]
    fn test_generation_request_body_shape() {
        let request = GenerationRequest {
            name: "/d1/orders/db_pw".to_string(),
            variable_type: "password".to_string(),
            parameters: serde_json::json!({}),
            mode: UpdateMode::NoOverwrite,
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "/d1/orders/db_pw",
                "type": "password",
                "parameters": {},
                "mode": "no-overwrite"
            })
        );
    }
}
