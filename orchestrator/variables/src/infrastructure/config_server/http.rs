// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Config Server HTTP Transport
//
// Anti-Corruption Layer for the config server data API. Speaks raw HTTP only:
// status codes and bodies are handed back untouched and interpreted by the
// typed client one layer up.
//
// Routes, relative to the base URL:
// - `GET /<name>`   latest version by name
// - `GET /id/<id>`  exact version
// - `POST /`        generate
//
// Every path part is percent-encoded as its own segment.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::domain::config_server::{ConfigServerTransport, TransportError, TransportResponse};

pub struct HttpConfigServerTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConfigServerTransport {
    /// `base_url` is the data endpoint, e.g. `https://config-server:8080/v1/data`.
    /// Certificate validation is always on; `ca_cert_path` adds a trust root.
    pub fn new(
        base_url: impl Into<String>,
        ca_cert_path: Option<&Path>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = build_client(ca_cert_path, timeout)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL extended by `segments`, each encoded as one path segment.
    fn url_for<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<reqwest::Url, TransportError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            TransportError::Configuration(format!(
                "Invalid config server URL '{}': {}",
                self.base_url, e
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::Configuration(format!(
                    "Config server URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let request = match bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

/// reqwest client trusting the platform roots plus an optional PEM bundle.
pub(crate) fn build_client(
    ca_cert_path: Option<&Path>,
    timeout: Duration,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let Some(path) = ca_cert_path {
        let pem = std::fs::read(path).map_err(|e| {
            TransportError::Configuration(format!("Failed to read CA certificate {:?}: {}", path, e))
        })?;
        let certificates = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
            TransportError::Configuration(format!("Invalid CA certificate {:?}: {}", path, e))
        })?;
        for certificate in certificates {
            builder = builder.add_root_certificate(certificate);
        }
    }

    builder
        .build()
        .map_err(|e| TransportError::Configuration(e.to_string()))
}

#[async_trait]
impl ConfigServerTransport for HttpConfigServerTransport {
    async fn get(
        &self,
        name: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        // Absolute names keep their slashes as path separators
        let url = self.url_for(name.split('/').filter(|segment| !segment.is_empty()))?;
        self.send(self.client.get(url), bearer_token).await
    }

    async fn get_by_id(
        &self,
        id: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.url_for(["id", id])?;
        self.send(self.client.get(url), bearer_token).await
    }

    async fn post(
        &self,
        body: &Value,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let request = self.client.post(&self.base_url).json(body);
        self.send(request, bearer_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn transport(server: &mockito::ServerGuard) -> HttpConfigServerTransport {
        HttpConfigServerTransport::new(
            format!("{}/v1/data/", server.url()),
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_by_name_uses_name_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/data/d1/orders/db_pw")
            .match_header("authorization", "Bearer t1")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let response = transport(&server)
            .get("/d1/orders/db_pw", Some("t1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"data":[]}"#);
    }

    #[tokio::test]
    async fn test_routes_relative_to_bare_host() {
        let mut server = mockito::Server::new_async().await;
        let by_name = server
            .mock("GET", "/db_pw")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;
        let by_id = server
            .mock("GET", "/id/42")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let transport =
            HttpConfigServerTransport::new(server.url(), None, Duration::from_secs(5)).unwrap();

        assert_eq!(transport.get("db_pw", None).await.unwrap().status, 200);
        assert_eq!(transport.get_by_id("42", None).await.unwrap().status, 200);
        by_name.assert_async().await;
        by_id.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_by_id_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/data/id/42")
            .with_status(404)
            .create_async()
            .await;

        let response = transport(&server).get_by_id("42", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_get_by_id_encodes_opaque_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/data/id/a%2Fb%20c%3F")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let response = transport(&server).get_by_id("a/b c?", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_url_for_segments() {
        let transport = HttpConfigServerTransport::with_client(
            reqwest::Client::new(),
            "https://config-server:8080/v1/data/",
        );
        let url = transport.url_for(["d1", "orders", "db_pw"]).unwrap();
        assert_eq!(url.as_str(), "https://config-server:8080/v1/data/d1/orders/db_pw");

        let url = transport.url_for(["id", "7"]).unwrap();
        assert_eq!(url.as_str(), "https://config-server:8080/v1/data/id/7");
    }

    #[tokio::test]
    async fn test_post_sends_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/data")
            .match_body(Matcher::PartialJson(serde_json::json!({"type": "password"})))
            .with_status(200)
            .with_body(r#"{"id":"1","name":"/d1/orders/pw","value":"secret"}"#)
            .create_async()
            .await;

        let response = transport(&server)
            .post(&serde_json::json!({"name": "/d1/orders/pw", "type": "password"}), None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_connection_refused_is_retryable() {
        let transport = HttpConfigServerTransport::new(
            "http://127.0.0.1:1/v1/data",
            None,
            Duration::from_secs(1),
        )
        .unwrap();

        let error = transport.get("x", None).await.unwrap_err();
        assert!(error.is_retryable(), "unexpected error: {error:?}");
    }

    #[test]
    fn test_missing_ca_file_is_configuration_error() {
        let result = HttpConfigServerTransport::new(
            "https://config-server:8080/v1/data",
            Some(Path::new("/nonexistent/ca.pem")),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(TransportError::Configuration(_))));
    }
}
