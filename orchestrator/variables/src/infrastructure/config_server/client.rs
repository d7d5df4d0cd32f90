// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Typed Config Server Client
//
// Interprets raw transport responses: status mapping, JSON parsing and
// explicit shape validation of the three response bodies.
//
//   by name:  {"data": [{"id", "name", "value"}, ...]}   (element 0 used)
//   by id:    {"id", "name", "value"}
//   generate: {"id", "name", "value"}

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::domain::config_server::{ConfigServerError, ConfigServerTransport, TransportResponse};
use crate::domain::variable::{GenerationRequest, Variable, VariableId};

#[derive(Clone)]
pub struct ConfigServerClient {
    transport: Arc<dyn ConfigServerTransport>,
}

/// Body of a lookup by name before validation.
#[derive(Deserialize)]
struct NameLookupBody {
    #[serde(default)]
    data: Option<Value>,
}

/// `{id, name, value}` before validation. A `null` value is still a value.
type VariableBody = Map<String, Value>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ConfigServerClient {
    pub fn new(transport: Arc<dyn ConfigServerTransport>) -> Self {
        Self { transport }
    }

    /// Latest version of `name`.
    pub async fn get_by_name(&self, name: &str) -> Result<Variable, ConfigServerError> {
        debug!(variable = name, "Fetching latest variable value");
        let response = self.transport.get(name, None).await?;
        let body = check_lookup_status(name, response)?;

        let fetch_error =
            |detail: &str| ConfigServerError::Fetch(format!("{}: {}", fetch_prefix(name), detail));

        let parsed: NameLookupBody =
            serde_json::from_str(&body).map_err(|_| fetch_error("Invalid JSON response"))?;

        let entries = match parsed.data {
            Some(Value::Array(entries)) => entries,
            _ => return Err(fetch_error("Expected data to be an array")),
        };
        let first = entries
            .into_iter()
            .next()
            .ok_or_else(|| fetch_error("Expected data to be non empty array"))?;

        let entry: VariableBody = serde_json::from_value(first)
            .map_err(|_| fetch_error("Expected data[0] to be a hash"))?;

        into_variable(entry, name, "data[0]").map_err(|detail| fetch_error(&detail))
    }

    /// Exact version `id` of `name`.
    pub async fn get_by_id(&self, name: &str, id: &VariableId) -> Result<Variable, ConfigServerError> {
        debug!(variable = name, id = %id, "Fetching variable value by id");
        let response = self.transport.get_by_id(id.as_str(), None).await?;
        let body = check_lookup_status(name, response)?;

        let fetch_error =
            |detail: &str| ConfigServerError::Fetch(format!("{}: {}", fetch_prefix(name), detail));

        let entry: VariableBody =
            serde_json::from_str(&body).map_err(|_| fetch_error("Invalid JSON response"))?;

        let mut variable = into_variable(entry, name, "data").map_err(|detail| fetch_error(&detail))?;
        if variable.id != *id {
            debug!(variable = name, requested = %id, returned = %variable.id, "Config server returned a different id");
            variable.id = id.clone();
        }
        Ok(variable)
    }

    /// Generate a value. Any non-success status or malformed body is a
    /// `Generation` error naming the variable and type.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Variable, ConfigServerError> {
        debug!(variable = %request.name, variable_type = %request.variable_type, mode = %request.mode, "Generating variable");

        let body = serde_json::to_value(request).map_err(|e| {
            ConfigServerError::Generation(format!(
                "Failed to serialize generation request for '{}': {}",
                request.name, e
            ))
        })?;
        let response = self.transport.post(&body, None).await?;

        if !response.is_success() {
            return Err(ConfigServerError::Generation(format!(
                "Config Server failed to generate value for '{}' with type '{}'. HTTP Code '{}', Error: '{}'",
                request.name,
                request.variable_type,
                response.status,
                error_text(&response.body)
            )));
        }

        let entry: VariableBody = serde_json::from_str(&response.body).map_err(|_| {
            ConfigServerError::Generation(format!(
                "Config Server returned a NON-JSON body while generating value for '{}' with type '{}'",
                request.name, request.variable_type
            ))
        })?;

        into_variable(entry, &request.name, "response").map_err(|detail| {
            ConfigServerError::Generation(format!(
                "Failed to generate variable '{}' with type '{}': {}",
                request.name, request.variable_type, detail
            ))
        })
    }

    /// Whether any version of `name` is stored.
    pub async fn exists(&self, name: &str) -> Result<bool, ConfigServerError> {
        match self.get_by_name(name).await {
            Ok(_) => Ok(true),
            Err(ConfigServerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn fetch_prefix(name: &str) -> String {
    format!("Failed to fetch variable '{}' from config server", name)
}

fn check_lookup_status(name: &str, response: TransportResponse) -> Result<String, ConfigServerError> {
    match response.status {
        status if (200..300).contains(&status) => Ok(response.body),
        404 => Err(ConfigServerError::NotFound(format!(
            "Failed to find variable '{}' from config server: HTTP Code '404', Error: 'Name not found'",
            name
        ))),
        status => Err(ConfigServerError::Fetch(format!(
            "{}: HTTP Code '{}', Error: '{}'",
            fetch_prefix(name),
            status,
            error_text(&response.body)
        ))),
    }
}

/// Server error text: the JSON `error` field when present, the raw body otherwise.
fn error_text(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.to_string())
}

fn into_variable(mut entry: VariableBody, requested_name: &str, label: &str) -> Result<Variable, String> {
    let id = match entry.remove("id") {
        Some(Value::String(id)) => VariableId(id),
        Some(Value::Number(id)) => VariableId(id.to_string()),
        _ => return Err(format!("Expected {} to have key 'id'", label)),
    };
    let value = entry
        .remove("value")
        .ok_or_else(|| format!("Expected {} to have key 'value'", label))?;
    let name = match entry.remove("name") {
        Some(Value::String(name)) => name,
        _ => requested_name.to_string(),
    };

    Ok(Variable { id, name, value })
}
