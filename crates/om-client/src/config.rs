//! # Client Configuration
//!
//! Loaded from a TOML file (missing file means defaults), then overridden
//! by `OHARA_CONFIGURATOR` / `OHARA_API_KEY`.
//!
//! ```toml
//! configurator = "http://10.0.0.5:12345"
//! timeout_ms = 10000
//!
//! [wait]
//! interval_ms = 2000
//! max_retry = 10
//! ```

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_CONFIGURATOR: &str = "OHARA_CONFIGURATOR";
pub const ENV_API_KEY: &str = "OHARA_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the configurator; request paths carry the `/v0` prefix.
    #[serde(default = "default_configurator")]
    pub configurator: String,
    /// Sent as a bearer token when present.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub wait: WaitConfig,
}

/// Budget of the poll that follows asynchronous lifecycle calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            configurator: default_configurator(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            wait: WaitConfig::default(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retry: default_max_retry(),
        }
    }
}

fn default_configurator() -> String {
    "http://localhost:12345".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_interval_ms() -> u64 {
    2_000
}
fn default_max_retry() -> u32 {
    10
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ClientConfig {
    pub fn from_toml(content: &str) -> Result<Self, ClientError> {
        toml::from_str(content).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Reads `path` if it exists and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
            Self::from_toml(&content)?
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Self::default()
        };
        Ok(config.with_env())
    }

    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_CONFIGURATOR).ok(),
            std::env::var(ENV_API_KEY).ok(),
        )
    }

    fn with_overrides(mut self, configurator: Option<String>, api_key: Option<String>) -> Self {
        if let Some(url) = configurator.filter(|u| !u.is_empty()) {
            self.configurator = url;
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
