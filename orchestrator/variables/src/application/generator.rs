// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Generator
//!
//! Creates the values declared in a deployment's `variables:` section on the
//! config server, pins the resulting ids in the deployment's current
//! variable set and emits one audit event per variable.
//!
//! Declarations are processed strictly in input order. A certificate signed
//! by a CA declared in the same list must come after that CA.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Secret generation and versioning

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::variable_set_store::VariableSetStore;
use crate::domain::config_server::{ConfigServerError, TransportError};
use crate::domain::declaration::{
    LinkAddressError, LinkAddressResolver, VariableDeclaration, CONSUME_ALTERNATIVE_NAME,
    CONSUME_COMMON_NAME,
};
use crate::domain::events::{AuditEventSink, VariableEvent};
use crate::domain::variable::{GenerationRequest, RequestContext, UpdateMode, VariableId};
use crate::domain::variable_name::{
    extract_name, is_full_placeholder, qualify, validate_name, NameSyntaxError, PlaceholderName,
};
use crate::domain::variable_set::{VariableSet, VariableSetError};
use crate::infrastructure::config_server::ConfigServerClient;

/// Property types the config server can generate a value for.
pub const GENERATABLE_TYPES: [&str; 4] = ["password", "certificate", "ssh", "rsa"];

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Variable '{0}' cannot be generated. Variable generation allowed only during deploy action")]
    NotWritable(String),

    /// Config server rejected the request or answered with a malformed body
    #[error("{0}")]
    Generation(String),

    #[error(transparent)]
    NameSyntax(#[from] NameSyntaxError),

    #[error(transparent)]
    Link(#[from] LinkAddressError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    VariableSet(#[from] VariableSetError),

    #[error("No variable set found for deployment '{0}'")]
    MissingVariableSet(String),
}

impl From<ConfigServerError> for GenerationError {
    fn from(err: ConfigServerError) -> Self {
        match err {
            ConfigServerError::Transport(e) => GenerationError::Transport(e),
            other => GenerationError::Generation(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationFlags {
    /// Default mode `converge` for declarations without an `update_mode`
    pub converge: bool,
    /// Derive certificate DNS names from link DNS aliases
    pub use_link_dns_names: bool,
    pub stemcell_changed: bool,
}

/// Outcome for one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVariable {
    pub name: String,
    pub id: VariableId,
    pub mode: UpdateMode,
    /// False when an earlier generation's id was reused
    pub latest_version: bool,
}

pub struct Generator {
    client: ConfigServerClient,
    store: VariableSetStore,
    audit: Arc<dyn AuditEventSink>,
    links: Arc<dyn LinkAddressResolver>,
    director_name: String,
}

impl Generator {
    pub fn new(
        client: ConfigServerClient,
        store: VariableSetStore,
        audit: Arc<dyn AuditEventSink>,
        links: Arc<dyn LinkAddressResolver>,
        director_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            audit,
            links,
            director_name: director_name.into(),
        }
    }

    /// Generate `declarations` for `deployment` into its current variable set.
    pub async fn generate_values(
        &self,
        declarations: &[VariableDeclaration],
        deployment: &str,
        flags: GenerationFlags,
        request: &RequestContext,
    ) -> Result<Vec<GeneratedVariable>, GenerationError> {
        let Some(first) = declarations.first() else {
            return Ok(Vec::new());
        };

        let set = self
            .store
            .current(deployment)
            .await?
            .ok_or_else(|| GenerationError::MissingVariableSet(deployment.to_string()))?;

        if !set.writable {
            return Err(GenerationError::NotWritable(qualify(
                &first.name,
                &self.director_name,
                deployment,
            )));
        }

        info!(
            deployment,
            set_id = %set.id,
            count = declarations.len(),
            "Generating variables"
        );

        let mut generated = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            generated.push(self.generate_one(declaration, &set, flags, request).await?);
        }
        Ok(generated)
    }

    async fn generate_one(
        &self,
        declaration: &VariableDeclaration,
        set: &VariableSet,
        flags: GenerationFlags,
        request: &RequestContext,
    ) -> Result<GeneratedVariable, GenerationError> {
        validate_name(&declaration.name)?;
        let deployment = set.deployment.as_str();
        let name = qualify(&declaration.name, &self.director_name, deployment);

        let mode = declaration.update_mode.unwrap_or(if flags.converge {
            UpdateMode::Converge
        } else {
            UpdateMode::NoOverwrite
        });

        let wire_mode = match mode {
            UpdateMode::OnStemcellChange if flags.stemcell_changed => UpdateMode::Overwrite,
            UpdateMode::OnStemcellChange => {
                if let Some(previous) = self.store.previous_variable_id(&name, set).await? {
                    let id = self.store.add(&name, &previous, set).await?;
                    debug!(variable = %name, id = %id, "Reusing variable from previous deploy");
                    self.emit(VariableEvent::variable_created(
                        request, deployment, &name, &id, mode, false,
                    ))
                    .await;
                    return Ok(GeneratedVariable {
                        name,
                        id,
                        mode,
                        latest_version: false,
                    });
                }
                UpdateMode::NoOverwrite
            }
            other => other,
        };

        let parameters = self.parameters(declaration, deployment, flags).await?;
        let generation = GenerationRequest {
            name: name.clone(),
            variable_type: declaration.variable_type.clone(),
            parameters,
            mode: wire_mode,
        };

        let variable = match self.client.generate(&generation).await {
            Ok(variable) => variable,
            Err(e) => {
                warn!(variable = %name, error = %e, "Variable generation failed");
                self.emit(VariableEvent::variable_failed(
                    request,
                    deployment,
                    &name,
                    mode,
                    e.to_string(),
                ))
                .await;
                return Err(e.into());
            }
        };

        let id = self.store.add(&name, &variable.id, set).await?;
        info!(variable = %name, id = %id, mode = %mode, "Generated variable");
        self.emit(VariableEvent::variable_created(
            request, deployment, &name, &id, mode, true,
        ))
        .await;

        Ok(GeneratedVariable {
            name,
            id,
            mode,
            latest_version: true,
        })
    }

    /// Generation parameters: declared options, with certificate CA
    /// qualification and link-derived DNS names applied.
    async fn parameters(
        &self,
        declaration: &VariableDeclaration,
        deployment: &str,
        flags: GenerationFlags,
    ) -> Result<Value, GenerationError> {
        let mut options: Map<String, Value> = declaration.options.clone();
        if !declaration.is_certificate() {
            return Ok(Value::Object(options));
        }

        if let Some(Value::String(ca)) = options.get("ca") {
            let ca = qualify(ca, &self.director_name, deployment);
            options.insert("ca".to_string(), Value::String(ca));
        }

        for (kind, link) in declaration.consumes.iter().flatten() {
            let mut address = self
                .links
                .address(&declaration.name, deployment, link, flags.use_link_dns_names)
                .await?;
            if link.properties.wildcard {
                address = wildcard(&address);
            }

            match kind.as_str() {
                CONSUME_ALTERNATIVE_NAME => {
                    let names = options
                        .entry("alternative_names")
                        .or_insert_with(|| Value::Array(Vec::new()));
                    match names {
                        Value::Array(names) => names.push(Value::String(address)),
                        other => *other = Value::Array(vec![Value::String(address)]),
                    }
                }
                CONSUME_COMMON_NAME => {
                    options
                        .entry("common_name")
                        .or_insert(Value::String(address));
                }
                other => {
                    warn!(variable = %declaration.name, consume = other, "Ignoring unsupported consume kind");
                }
            }
        }

        Ok(Value::Object(options))
    }

    /// Decide the value for a release job property.
    ///
    /// A placeholder that names a stored variable is kept. Otherwise the
    /// default wins, and without a default a generatable property type is
    /// generated with `no-overwrite`.
    pub async fn prepare_property(
        &self,
        provided: Option<&Value>,
        default: Option<&Value>,
        property_type: Option<&str>,
        deployment: &str,
        request: &RequestContext,
    ) -> Result<Option<Value>, GenerationError> {
        let Some(provided) = provided else {
            return Ok(default.cloned());
        };

        let placeholder = match provided {
            Value::String(text) if is_full_placeholder(text) => text,
            _ => return Ok(Some(provided.clone())),
        };

        let parsed = PlaceholderName::parse(&extract_name(placeholder)?);
        let name = qualify(&parsed.base, &self.director_name, deployment);

        if self.client.exists(&name).await? {
            return Ok(Some(provided.clone()));
        }
        if let Some(default) = default {
            return Ok(Some(default.clone()));
        }

        if let Some(variable_type) = property_type.filter(|t| GENERATABLE_TYPES.contains(t)) {
            let generation = GenerationRequest {
                name: name.clone(),
                variable_type: variable_type.to_string(),
                parameters: Value::Object(Map::new()),
                mode: UpdateMode::NoOverwrite,
            };

            match self.client.generate(&generation).await {
                Ok(variable) => {
                    info!(variable = %name, id = %variable.id, "Generated property value");
                    self.emit(VariableEvent::variable_created(
                        request,
                        deployment,
                        &name,
                        &variable.id,
                        UpdateMode::NoOverwrite,
                        true,
                    ))
                    .await;
                }
                Err(e) => {
                    self.emit(VariableEvent::variable_failed(
                        request,
                        deployment,
                        &name,
                        UpdateMode::NoOverwrite,
                        e.to_string(),
                    ))
                    .await;
                    return Err(e.into());
                }
            }
        }

        Ok(Some(provided.clone()))
    }

    async fn emit(&self, event: VariableEvent) {
        let name = event.object_name.clone();
        if let Err(e) = self.audit.record(event).await {
            warn!(variable = %name, error = %e, "Failed to record variable audit event");
        }
    }
}

/// `q-s0.group.net.dep.bosh` becomes `*.group.net.dep.bosh`.
fn wildcard(address: &str) -> String {
    match address.split_once('.') {
        Some((_, rest)) => format!("*.{}", rest),
        None => format!("*.{}", address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_replaces_first_label() {
        assert_eq!(wildcard("q-s0.db.default.orders.bosh"), "*.db.default.orders.bosh");
        assert_eq!(wildcard("localhost"), "*.localhost");
    }

    #[test]
    fn test_config_server_error_mapping() {
        let error: GenerationError =
            ConfigServerError::Transport(TransportError::Timeout("t".into())).into();
        assert!(matches!(error, GenerationError::Transport(_)));

        let error: GenerationError = ConfigServerError::Generation("boom".into()).into();
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn test_not_writable_message() {
        assert_eq!(
            GenerationError::NotWritable("/d1/orders/pw".into()).to_string(),
            "Variable '/d1/orders/pw' cannot be generated. Variable generation allowed only during deploy action"
        );
    }
}
