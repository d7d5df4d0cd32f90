// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Config Server Authentication
//
// `AuthenticatedTransport` attaches a bearer token from a `TokenProvider` to
// every call. A 401 triggers exactly one token refresh and one more attempt;
// a second 401 is fatal.
//
// Token providers:
// - `StaticTokenProvider`: fixed token from configuration
// - `ClientCredentialsTokenProvider`: OAuth2 client-credentials grant against
//   a UAA-style token endpoint, cached until shortly before expiry

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::config_server::{
    ConfigServerTransport, TokenProvider, TransportError, TransportResponse,
};

/// Tokens are renewed this long before the server-declared expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

pub struct AuthenticatedTransport {
    inner: Arc<dyn ConfigServerTransport>,
    tokens: Arc<dyn TokenProvider>,
}

impl AuthenticatedTransport {
    pub fn new(inner: Arc<dyn ConfigServerTransport>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { inner, tokens }
    }

    async fn with_token<F, Fut>(&self, call: F) -> Result<TransportResponse, TransportError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<TransportResponse, TransportError>>,
    {
        let token = self.tokens.token().await?;
        let response = call(token).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        info!("Config server rejected access token, refreshing");
        let token = self.tokens.refresh().await?;
        let response = call(token).await?;
        if response.is_unauthorized() {
            warn!("Config server rejected refreshed access token");
            return Err(TransportError::Unauthorized(response.body));
        }

        Ok(response)
    }
}

#[async_trait]
impl ConfigServerTransport for AuthenticatedTransport {
    async fn get(
        &self,
        name: &str,
        _bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let inner = &self.inner;
        self.with_token(|token| async move { inner.get(name, Some(&token)).await })
            .await
    }

    async fn get_by_id(
        &self,
        id: &str,
        _bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let inner = &self.inner;
        self.with_token(|token| async move { inner.get_by_id(id, Some(&token)).await })
            .await
    }

    async fn post(
        &self,
        body: &Value,
        _bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let inner = &self.inner;
        self.with_token(|token| async move { inner.post(body, Some(&token)).await })
            .await
    }
}

/// Fixed token, never refreshed.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String, TransportError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String, TransportError> {
        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

pub struct ClientCredentialsTokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsTokenProvider {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken, TransportError> {
        debug!(token_url = %self.token_url, client_id = %self.client_id, "Requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::TokenRequest(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            TransportError::TokenRequest(format!("Failed to parse token response: {}", e))
        })?;

        if let Some(token_type) = token.token_type.as_deref() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(TransportError::TokenRequest(format!(
                    "Unsupported token type '{}'",
                    token_type
                )));
            }
        }

        Ok(CachedToken {
            value: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsTokenProvider {
    async fn token(&self) -> Result<String, TransportError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn refresh(&self) -> Result<String, TransportError> {
        let mut cached = self.cached.lock().await;
        *cached = None;

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
