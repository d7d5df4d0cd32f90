// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Variables Configuration Types
//
// Configuration schema for the variable resolution engine:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Director identity used for namespace qualification
// - Config server endpoint, trust root, timeout and retry budget
// - Token acquisition for the config server
// - Optional PostgreSQL ledger

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

const API_VERSION: &str = "100monkeys.ai/v1";
const KIND: &str = "VariablesConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariablesConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "VariablesConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: VariablesConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariablesConfigSpec {
    /// Director name, first segment of every qualified variable name
    pub director_name: String,

    pub config_server: ConfigServerSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    /// Ledger database; in-memory ledger when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigServerSettings {
    /// Base URL of the data API (e.g. "https://config-server:8080/v1/data")
    pub url: String,

    /// PEM bundle trusted for the config server; platform roots when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert_path: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per call on connection-class failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay, doubled after each failed attempt
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthSettings {
    #[default]
    None,
    Static {
        /// Supports "env:VAR_NAME"
        token: String,
    },
    ClientCredentials {
        token_url: String,
        client_id: String,
        /// Supports "env:VAR_NAME"
        client_secret: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ca_cert_path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Supports "env:VAR_NAME"
    pub connection_string: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for VariablesConfigSpec {
    fn default() -> Self {
        Self {
            director_name: "aegis".to_string(),
            config_server: ConfigServerSettings {
                url: "https://127.0.0.1:8080/v1/data".to_string(),
                ca_cert_path: None,
                timeout_secs: default_timeout_secs(),
                retry: RetrySettings::default(),
            },
            auth: AuthSettings::None,
            database: None,
        }
    }
}

impl Default for VariablesConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "aegis-director".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                labels: None,
            },
            spec: VariablesConfigSpec::default(),
        }
    }
}

/// Resolve a secret value from config (supports "env:VAR_NAME" syntax)
pub fn resolve_secret(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name)
            .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
        None => Ok(value.to_string()),
    }
}

impl VariablesConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. AEGIS_VARIABLES_CONFIG_PATH environment variable
    /// 2. ./aegis-variables.yaml (working directory)
    /// 3. ~/.aegis/variables.yaml (user home)
    /// 4. /etc/aegis/variables.yaml (system, Unix) or C:\ProgramData\Aegis\variables.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("AEGIS_VARIABLES_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./aegis-variables.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".aegis").join("variables.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/aegis/variables.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Aegis\\variables.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("AEGIS_CONFIG_SERVER_URL") {
            tracing::info!("Environment override: AEGIS_CONFIG_SERVER_URL={}", url);
            self.spec.config_server.url = url;
        }

        if let Ok(name) = std::env::var("AEGIS_DIRECTOR_NAME") {
            tracing::info!("Environment override: AEGIS_DIRECTOR_NAME={}", name);
            self.spec.director_name = name;
        }
    }

    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match &self.spec.database {
            Some(database) => Ok(StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: resolve_secret(&database.connection_string)?,
            })),
            None => Ok(StorageBackend::InMemory),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let director = &self.spec.director_name;
        if director.is_empty() || director.contains('/') {
            anyhow::bail!(
                "spec.director_name must be a non-empty name without '/': '{}'",
                director
            );
        }

        let url = &self.spec.config_server.url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            anyhow::bail!("spec.config_server.url must be an http(s) URL: '{}'", url);
        }

        if self.spec.config_server.retry.max_attempts == 0 {
            anyhow::bail!("spec.config_server.retry.max_attempts must be at least 1");
        }

        if let AuthSettings::ClientCredentials {
            token_url,
            client_id,
            ..
        } = &self.spec.auth
        {
            if token_url.is_empty() {
                anyhow::bail!("spec.auth.token_url cannot be empty");
            }
            if client_id.is_empty() {
                anyhow::bail!("spec.auth.client_id cannot be empty");
            }
        }

        Ok(())
    }
}
