// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Connection Retry Decorator
//
// Re-issues a call when the transport fails at the connection level
// (refused, reset, TLS handshake, timeout). Any HTTP response, whatever its
// status, is returned to the caller as-is.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::config_server::{ConfigServerTransport, TransportError, TransportResponse};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    /// `base * 2^(attempt - 1)`
    Exponential { base: Duration },
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential { base } => *base * 2_u32.saturating_pow(attempt.saturating_sub(1)),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            base: Duration::from_millis(1000),
        }
    }
}

pub struct RetryingTransport {
    inner: Arc<dyn ConfigServerTransport>,
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn ConfigServerTransport>, max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    async fn with_retry<F, Fut>(&self, operation: &str, call: F) -> Result<TransportResponse, TransportError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<TransportResponse, TransportError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(response) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Config server call succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        "Config server call failed (attempt {}/{}): {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ConfigServerTransport for RetryingTransport {
    async fn get(
        &self,
        name: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.with_retry("get", || self.inner.get(name, bearer_token))
            .await
    }

    async fn get_by_id(
        &self,
        id: &str,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.with_retry("get_by_id", || self.inner.get_by_id(id, bearer_token))
            .await
    }

    async fn post(
        &self,
        body: &Value,
        bearer_token: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.with_retry("post", || self.inner.post(body, bearer_token))
            .await
    }
}
