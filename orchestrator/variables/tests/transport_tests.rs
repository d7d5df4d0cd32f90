// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the config server transport stack against a
//! mockito HTTP server: token refresh on 401, connection retries and the
//! configuration-driven builder.

use aegis_variables::domain::config_server::{
    ConfigServerError, ConfigServerTransport, TokenProvider, TransportError, TransportResponse,
};
use aegis_variables::domain::variable::VariableId;
use aegis_variables::domain::variables_config::{AuthSettings, RetrySettings, VariablesConfigSpec};
use aegis_variables::infrastructure::config_server::{
    build_transport, AuthenticatedTransport, Backoff, ConfigServerClient, HttpConfigServerTransport,
    RetryingTransport,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Hands out `t1`, then `t2`, `t3`, ... on each refresh.
#[derive(Default)]
struct RotatingTokenProvider {
    generation: AtomicU32,
}

#[async_trait]
impl TokenProvider for RotatingTokenProvider {
    async fn token(&self) -> Result<String, TransportError> {
        Ok(format!("t{}", self.generation.load(Ordering::SeqCst) + 1))
    }

    async fn refresh(&self) -> Result<String, TransportError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("t{}", generation + 1))
    }
}

/// Counts calls reaching the wrapped transport.
struct CountingTransport {
    inner: Arc<dyn ConfigServerTransport>,
    calls: AtomicU32,
}

#[async_trait]
impl ConfigServerTransport for CountingTransport {
    async fn get(&self, name: &str, token: Option<&str>) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(name, token).await
    }

    async fn get_by_id(&self, id: &str, token: Option<&str>) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id, token).await
    }

    async fn post(&self, body: &Value, token: Option<&str>) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.post(body, token).await
    }
}

fn http(base_url: String) -> Arc<dyn ConfigServerTransport> {
    Arc::new(HttpConfigServerTransport::new(base_url, None, Duration::from_secs(2)).unwrap())
}

fn stack(base_url: String, tokens: Arc<dyn TokenProvider>) -> ConfigServerClient {
    let authenticated = Arc::new(AuthenticatedTransport::new(http(base_url), tokens));
    ConfigServerClient::new(Arc::new(RetryingTransport::new(authenticated, 3, Backoff::None)))
}

#[tokio::test]
async fn test_refreshes_token_once_on_401() {
    let mut server = mockito::Server::new_async().await;
    let rejected = server
        .mock("GET", "/v1/data/d1/orders/pw")
        .match_header("authorization", "Bearer t1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("GET", "/v1/data/d1/orders/pw")
        .match_header("authorization", "Bearer t2")
        .with_status(200)
        .with_body(r#"{"data":[{"id":"9","name":"/d1/orders/pw","value":"s3cr3t"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let client = stack(
        format!("{}/v1/data", server.url()),
        Arc::new(RotatingTokenProvider::default()),
    );
    let variable = client.get_by_name("/d1/orders/pw").await.unwrap();

    assert_eq!(variable.id, VariableId::new("9"));
    rejected.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn test_second_401_is_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/data/id/9")
        .with_status(401)
        .with_body("token rejected")
        .expect(2)
        .create_async()
        .await;

    let client = stack(
        format!("{}/v1/data", server.url()),
        Arc::new(RotatingTokenProvider::default()),
    );
    let error = client
        .get_by_id("/d1/orders/pw", &VariableId::new("9"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ConfigServerError::Transport(TransportError::Unauthorized(_))
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_failures_retried_three_times() {
    let counting = Arc::new(CountingTransport {
        inner: http("http://127.0.0.1:1/v1/data".to_string()),
        calls: AtomicU32::new(0),
    });
    let client = ConfigServerClient::new(Arc::new(RetryingTransport::new(
        counting.clone(),
        3,
        Backoff::None,
    )));

    let error = client.get_by_name("/d1/orders/pw").await.unwrap_err();

    assert!(matches!(
        error,
        ConfigServerError::Transport(TransportError::Connection(_))
    ));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/data")
        .with_status(500)
        .with_body(r#"{"error":"boom"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = stack(
        format!("{}/v1/data", server.url()),
        Arc::new(RotatingTokenProvider::default()),
    );
    let request = aegis_variables::domain::variable::GenerationRequest {
        name: "/d1/orders/pw".into(),
        variable_type: "password".into(),
        parameters: Value::Object(Default::default()),
        mode: Default::default(),
    };

    let error = client.generate(&request).await.unwrap_err();
    assert!(matches!(error, ConfigServerError::Generation(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transport_built_from_configuration() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/data/d1/orders/pw")
        .match_header("authorization", "Bearer configured")
        .with_status(404)
        .create_async()
        .await;

    let mut spec = VariablesConfigSpec::default();
    spec.config_server.url = format!("{}/v1/data", server.url());
    spec.config_server.retry = RetrySettings {
        max_attempts: 1,
        backoff_ms: 0,
    };
    spec.auth = AuthSettings::Static {
        token: "configured".to_string(),
    };

    let client = ConfigServerClient::new(build_transport(&spec).unwrap());
    assert!(!client.exists("/d1/orders/pw").await.unwrap());
    mock.assert_async().await;
}
