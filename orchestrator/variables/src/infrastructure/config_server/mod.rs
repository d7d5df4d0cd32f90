// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Config Server Adapters
//!
//! reqwest transport, the authentication and retry decorators, token
//! providers and the typed client. [`build_transport`] assembles the stack
//! from configuration as `Retrying(Authenticated(Http))`.

pub mod auth;
pub mod client;
pub mod http;
pub mod retry;

pub use auth::{AuthenticatedTransport, ClientCredentialsTokenProvider, StaticTokenProvider};
pub use client::ConfigServerClient;
pub use http::HttpConfigServerTransport;
pub use retry::{Backoff, RetryingTransport};

use std::sync::Arc;
use std::time::Duration;

use crate::domain::config_server::{ConfigServerTransport, TokenProvider};
use crate::domain::variables_config::{resolve_secret, AuthSettings, VariablesConfigSpec};

/// Build the configured transport stack.
pub fn build_transport(spec: &VariablesConfigSpec) -> anyhow::Result<Arc<dyn ConfigServerTransport>> {
    let settings = &spec.config_server;
    let timeout = Duration::from_secs(settings.timeout_secs);

    let mut transport: Arc<dyn ConfigServerTransport> = Arc::new(HttpConfigServerTransport::new(
        settings.url.clone(),
        settings.ca_cert_path.as_deref(),
        timeout,
    )?);

    if let Some(tokens) = build_token_provider(&spec.auth, timeout)? {
        transport = Arc::new(AuthenticatedTransport::new(transport, tokens));
    }

    let backoff = match settings.retry.backoff_ms {
        0 => Backoff::None,
        ms => Backoff::Exponential {
            base: Duration::from_millis(ms),
        },
    };

    tracing::info!(
        url = %settings.url,
        max_attempts = settings.retry.max_attempts,
        "Config server transport configured"
    );

    Ok(Arc::new(RetryingTransport::new(
        transport,
        settings.retry.max_attempts,
        backoff,
    )))
}

fn build_token_provider(
    auth: &AuthSettings,
    timeout: Duration,
) -> anyhow::Result<Option<Arc<dyn TokenProvider>>> {
    match auth {
        AuthSettings::None => Ok(None),
        AuthSettings::Static { token } => {
            Ok(Some(Arc::new(StaticTokenProvider::new(resolve_secret(token)?))))
        }
        AuthSettings::ClientCredentials {
            token_url,
            client_id,
            client_secret,
            ca_cert_path,
        } => {
            let client = http::build_client(ca_cert_path.as_deref(), timeout)?;
            Ok(Some(Arc::new(ClientCredentialsTokenProvider::new(
                client,
                token_url.clone(),
                client_id.clone(),
                resolve_secret(client_secret)?,
            ))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_stack() {
        let spec = VariablesConfigSpec::default();
        assert!(build_transport(&spec).is_ok());
    }

    #[test]
    fn test_missing_secret_env_fails() {
        let mut spec = VariablesConfigSpec::default();
        spec.auth = AuthSettings::Static {
            token: "env:AEGIS_VARIABLES_TEST_MISSING_TOKEN".to_string(),
        };
        assert!(build_transport(&spec).is_err());
    }
}
