// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures: an in-process config server speaking the transport
//! protocol, plus helpers to wire the engine services around it.

#![allow(dead_code)]

use aegis_variables::application::{Generator, Interpolator, LinkResolver, VariableSetStore};
use aegis_variables::domain::config_server::{
    ConfigServerTransport, TransportError, TransportResponse,
};
use aegis_variables::infrastructure::config_server::ConfigServerClient;
use aegis_variables::infrastructure::link_addresses::StaticLinkAddressResolver;
use aegis_variables::infrastructure::repositories::InMemoryVariableSetRepository;
use aegis_variables::domain::repository::{RepositoryError, VariableSetRepository};
use aegis_variables::domain::variable::VariableId;
use aegis_variables::domain::variable_set::{VariableAssociation, VariableSet, VariableSetId};
use aegis_variables::infrastructure::EventBus;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DIRECTOR: &str = "d1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String),
    GetById(String),
    Post(String),
}

#[derive(Clone)]
struct Stored {
    id: String,
    value: Value,
    parameters: Value,
}

#[derive(Default)]
struct State {
    /// Versions per name, oldest first
    variables: HashMap<String, Vec<Stored>>,
    next_id: u64,
    calls: Vec<Call>,
    failing_generations: HashSet<String>,
    failing_lookups: HashSet<String>,
}

/// Config server double with no-overwrite / overwrite / converge semantics.
#[derive(Default)]
pub struct FakeConfigServer {
    state: Mutex<State>,
}

impl FakeConfigServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a new version of `name`, returning its id.
    pub fn put(&self, name: &str, value: Value) -> String {
        let mut state = self.state.lock();
        Self::store(&mut state, name, value, Value::Null)
    }

    fn store(state: &mut State, name: &str, value: Value, parameters: Value) -> String {
        state.next_id += 1;
        let id = state.next_id.to_string();
        state
            .variables
            .entry(name.to_string())
            .or_default()
            .push(Stored {
                id: id.clone(),
                value,
                parameters,
            });
        id
    }

    pub fn fail_generation_for(&self, name: &str) {
        self.state.lock().failing_generations.insert(name.to_string());
    }

    /// Answer lookups of `name` with HTTP 500.
    pub fn fail_lookup_for(&self, name: &str) {
        self.state.lock().failing_lookups.insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn latest_id(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .variables
            .get(name)
            .and_then(|versions| versions.last())
            .map(|stored| stored.id.clone())
    }

    fn generated_value(variable_type: &str, id: &str) -> Value {
        match variable_type {
            "certificate" => json!({
                "ca": format!("ca-{id}"),
                "certificate": format!("cert-{id}"),
                "private_key": format!("key-{id}"),
            }),
            "ssh" | "rsa" => json!({
                "public_key": format!("pub-{id}"),
                "private_key": format!("priv-{id}"),
            }),
            _ => json!(format!("secret-{id}")),
        }
    }

    fn variable_body(name: &str, stored: &Stored) -> String {
        json!({"id": stored.id, "name": name, "value": stored.value}).to_string()
    }
}

#[async_trait]
impl ConfigServerTransport for FakeConfigServer {
    async fn get(
        &self,
        name: &str,
        _bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Get(name.to_string()));

        if state.failing_lookups.contains(name) {
            return Ok(TransportResponse::new(500, r#"{"error":"store unavailable"}"#));
        }

        Ok(match state.variables.get(name).and_then(|v| v.last()) {
            Some(stored) => TransportResponse::new(
                200,
                json!({"data": [{"id": stored.id, "name": name, "value": stored.value}]}).to_string(),
            ),
            None => TransportResponse::new(404, r#"{"error":"Name not found"}"#),
        })
    }

    async fn get_by_id(
        &self,
        id: &str,
        _bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock();
        state.calls.push(Call::GetById(id.to_string()));

        let found = state.variables.iter().find_map(|(name, versions)| {
            versions
                .iter()
                .find(|stored| stored.id == id)
                .map(|stored| Self::variable_body(name, stored))
        });

        Ok(match found {
            Some(body) => TransportResponse::new(200, body),
            None => TransportResponse::new(404, r#"{"error":"Name not found"}"#),
        })
    }

    async fn post(
        &self,
        body: &Value,
        _bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let name = body["name"].as_str().unwrap_or_default().to_string();
        let variable_type = body["type"].as_str().unwrap_or_default().to_string();
        let mode = body["mode"].as_str().unwrap_or("no-overwrite").to_string();
        let parameters = body["parameters"].clone();

        let mut state = self.state.lock();
        state.calls.push(Call::Post(name.clone()));

        if state.failing_generations.contains(&name) {
            return Ok(TransportResponse::new(500, r#"{"error":"generation failed"}"#));
        }

        let existing = state.variables.get(&name).and_then(|v| v.last()).cloned();
        let reuse = match (&existing, mode.as_str()) {
            (Some(_), "no-overwrite") => true,
            (Some(stored), "converge") => stored.parameters == parameters,
            _ => false,
        };

        let stored = match existing.filter(|_| reuse) {
            Some(stored) => stored,
            None => {
                let next = (state.next_id + 1).to_string();
                let value = Self::generated_value(&variable_type, &next);
                Self::store(&mut state, &name, value, parameters);
                state
                    .variables
                    .get(&name)
                    .and_then(|v| v.last())
                    .cloned()
                    .expect("just stored")
            }
        };

        Ok(TransportResponse::new(200, Self::variable_body(&name, &stored)))
    }
}

/// Engine services wired around one fake server and one in-memory ledger.
pub struct Harness {
    pub server: Arc<FakeConfigServer>,
    pub store: VariableSetStore,
    pub client: ConfigServerClient,
    pub events: EventBus,
    pub links: Arc<StaticLinkAddressResolver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryVariableSetRepository::new()))
    }

    pub fn with_repository(repository: Arc<dyn VariableSetRepository>) -> Self {
        let server = FakeConfigServer::new();
        let transport: Arc<dyn ConfigServerTransport> = server.clone();
        Self {
            server,
            store: VariableSetStore::new(repository),
            client: ConfigServerClient::new(transport),
            events: EventBus::new(100),
            links: Arc::new(StaticLinkAddressResolver::default()),
        }
    }

    pub fn interpolator(&self) -> Interpolator {
        Interpolator::new(self.client.clone(), self.store.clone(), DIRECTOR)
    }

    pub fn link_resolver(&self) -> LinkResolver {
        LinkResolver::new(self.client.clone(), self.store.clone(), DIRECTOR)
    }

    pub fn generator(&self) -> Generator {
        self.generator_with(self.client.clone())
    }

    /// Generator whose generation request bodies are recorded.
    pub fn capturing_generator(&self) -> (Generator, Arc<Mutex<Vec<Value>>>) {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(CapturingTransport {
            inner: self.server.clone(),
            bodies: bodies.clone(),
        });
        (self.generator_with(ConfigServerClient::new(transport)), bodies)
    }

    fn generator_with(&self, client: ConfigServerClient) -> Generator {
        Generator::new(
            client,
            self.store.clone(),
            Arc::new(self.events.clone()),
            self.links.clone(),
            DIRECTOR,
        )
    }
}

struct CapturingTransport {
    inner: Arc<FakeConfigServer>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl ConfigServerTransport for CapturingTransport {
    async fn get(
        &self,
        name: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.inner.get(name, bearer_token).await
    }

    async fn get_by_id(
        &self,
        id: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.inner.get_by_id(id, bearer_token).await
    }

    async fn post(
        &self,
        body: &Value,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.bodies.lock().push(body.clone());
        self.inner.post(body, bearer_token).await
    }
}

/// Ledger whose next insert for a scheduled name is preceded by a competing
/// writer's association, as if another resolver won the race in between.
#[derive(Default)]
pub struct RacingRepository {
    inner: InMemoryVariableSetRepository,
    competitors: Mutex<HashMap<String, VariableId>>,
}

impl RacingRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Before the next insert of `name`, store `winner` for it first.
    pub fn compete_for(&self, name: &str, winner: impl Into<String>) {
        self.competitors
            .lock()
            .insert(name.to_string(), VariableId::new(winner));
    }
}

#[async_trait]
impl VariableSetRepository for RacingRepository {
    async fn save_set(&self, set: &VariableSet) -> Result<(), RepositoryError> {
        self.inner.save_set(set).await
    }

    async fn find_set(&self, id: VariableSetId) -> Result<Option<VariableSet>, RepositoryError> {
        self.inner.find_set(id).await
    }

    async fn find_sets_by_deployment(
        &self,
        deployment: &str,
    ) -> Result<Vec<VariableSet>, RepositoryError> {
        self.inner.find_sets_by_deployment(deployment).await
    }

    async fn find_variable_id(
        &self,
        set_id: VariableSetId,
        name: &str,
    ) -> Result<Option<VariableId>, RepositoryError> {
        self.inner.find_variable_id(set_id, name).await
    }

    async fn insert_association(
        &self,
        association: &VariableAssociation,
    ) -> Result<(), RepositoryError> {
        let competitor = self.competitors.lock().remove(&association.variable_name);
        if let Some(winner) = competitor {
            let mut competing = association.clone();
            competing.variable_id = winner;
            self.inner.insert_association(&competing).await?;
        }
        self.inner.insert_association(association).await
    }

    async fn find_associations(
        &self,
        set_id: VariableSetId,
    ) -> Result<Vec<VariableAssociation>, RepositoryError> {
        self.inner.find_associations(set_id).await
    }
}
