// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Config Server Domain Interface (Anti-Corruption Layer)
//!
//! The remote secret store ("config server") is reached through one
//! minimal transport interface with three calls: latest value by name,
//! exact value by id, and generate. Authentication and connection retries
//! are layered on top as independent decorators that implement the same
//! trait (see `crate::infrastructure::config_server`).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Transport, token and error contracts for the config server

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Raw HTTP outcome. Status interpretation belongs to the typed client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Minimal transport to the config server.
///
/// `bearer_token` is supplied by the authenticating layer; callers above it
/// pass `None`.
#[async_trait]
pub trait ConfigServerTransport: Send + Sync {
    /// Latest version of `name`
    async fn get(
        &self,
        name: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError>;

    /// Exact version `id`
    async fn get_by_id(
        &self,
        id: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError>;

    /// Generate a value
    async fn post(
        &self,
        body: &Value,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Source of bearer tokens for the config server.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current token, possibly cached
    async fn token(&self) -> Result<String, TransportError>;

    /// Discard any cached token and obtain a new one
    async fn refresh(&self) -> Result<String, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection to config server failed: {0}")]
    Connection(String),

    #[error("Timed out while communicating with config server: {0}")]
    Timeout(String),

    /// Token rejected even after a refresh
    #[error("Not authorized by config server: {0}")]
    Unauthorized(String),

    #[error("Failed to obtain config server access token: {0}")]
    TokenRequest(String),

    #[error("Config server request failed: {0}")]
    Request(String),

    #[error("Invalid config server transport configuration: {0}")]
    Configuration(String),
}

impl TransportError {
    /// Connection-class failures (refused, reset, TLS handshake, timeout)
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connection(_) | TransportError::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors surfaced by the typed config server client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigServerError {
    /// 404 on a lookup
    #[error("{0}")]
    NotFound(String),

    /// Non-success status or malformed body on a lookup
    #[error("{0}")]
    Fetch(String),

    /// Non-success status or malformed body on a generation call
    #[error("{0}")]
    Generation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ConfigServerError {
    /// Lookup failures that interpolation collects instead of failing fast.
    pub fn is_reportable(&self) -> bool {
        matches!(self, ConfigServerError::NotFound(_) | ConfigServerError::Fetch(_))
    }
}
