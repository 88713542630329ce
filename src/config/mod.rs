//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KeyRotorError, Result};
use crate::generation::Generator;
use crate::models::ModelSettings;
use crate::provider::DEFAULT_BASE_URL;
use crate::registry::{InMemoryKeyRegistry, KeyRegistry, RpcKeyRegistry, RpcRegistryConfig};
use crate::retry::{Orchestrator, RetrySettings};

/// Global default config (lazy-initialized from file and env).
static DEFAULT_CONFIG: OnceLock<KeyRotorConfig> = OnceLock::new();

pub const ENV_API_KEYS: &str = "KEYROTOR_API_KEYS";
pub const ENV_REGISTRY_URL: &str = "KEYROTOR_REGISTRY_URL";
pub const ENV_REGISTRY_KEY: &str = "KEYROTOR_REGISTRY_KEY";
pub const ENV_MAX_ATTEMPTS: &str = "KEYROTOR_MAX_ATTEMPTS";
pub const ENV_BASE_URL: &str = "KEYROTOR_BASE_URL";

/// Where keys are leased from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistrySettings {
    /// Process-local pool.
    Memory {
        #[serde(default)]
        keys: Vec<String>,
    },
    /// Database-hosted pool reached over HTTP RPC.
    Rpc(RpcRegistryConfig),
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::Memory { keys: Vec::new() }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Layered configuration for keyrotor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRotorConfig {
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default = "default_base_url")]
    pub provider_base_url: String,
}

impl Default for KeyRotorConfig {
    fn default() -> Self {
        Self {
            registry: RegistrySettings::default(),
            retry: RetrySettings::default(),
            models: ModelSettings::default(),
            provider_base_url: default_base_url(),
        }
    }
}

impl KeyRotorConfig {
    /// Default config file (`<config dir>/keyrotor/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyrotor")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| KeyRotorError::Configuration(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source).map_err(|e| match e {
            KeyRotorError::Configuration(msg) => {
                KeyRotorError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Defaults overlaid with environment variables only.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults, then the default config file if it exists, then the environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match Self::default_path().filter(|p| p.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Get (or create) the global default config.
    ///
    /// Falls back to defaults when loading fails; call [`KeyRotorConfig::load`]
    /// to see the error.
    pub fn global() -> &'static KeyRotorConfig {
        DEFAULT_CONFIG.get_or_init(|| Self::load().unwrap_or_default())
    }

    /// Overlay `KEYROTOR_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| var(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(keys) = var(ENV_API_KEYS) {
            self.registry = RegistrySettings::Memory {
                keys: keys
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect(),
            };
        }

        match (var(ENV_REGISTRY_URL), var(ENV_REGISTRY_KEY)) {
            (Some(url), Some(key)) => match &mut self.registry {
                RegistrySettings::Rpc(rpc) => {
                    rpc.url = url;
                    rpc.service_key = key;
                }
                registry => *registry = RegistrySettings::Rpc(RpcRegistryConfig::new(url, key)),
            },
            (Some(_), None) => {
                return Err(KeyRotorError::Configuration(format!(
                    "{ENV_REGISTRY_URL} is set but {ENV_REGISTRY_KEY} is not"
                )))
            }
            _ => {}
        }

        if let Some(max) = var(ENV_MAX_ATTEMPTS) {
            self.retry.max_attempts = max.parse().map_err(|_| {
                KeyRotorError::Configuration(format!("{ENV_MAX_ATTEMPTS} must be a number, got {max:?}"))
            })?;
        }

        if let Some(url) = var(ENV_BASE_URL) {
            self.provider_base_url = url;
        }
        Ok(())
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(KeyRotorError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if let RegistrySettings::Rpc(rpc) = &self.registry {
            if rpc.url.trim().is_empty() || rpc.service_key.trim().is_empty() {
                return Err(KeyRotorError::Configuration(
                    "registry.url and registry.service_key are required for the rpc registry".into(),
                ));
            }
        }
        Ok(())
    }

    /// Build a new registry handle. In-memory pools do not share state between
    /// handles.
    pub fn build_registry(&self) -> Arc<dyn KeyRegistry> {
        match &self.registry {
            RegistrySettings::Memory { keys } => Arc::new(InMemoryKeyRegistry::new(keys.iter())),
            RegistrySettings::Rpc(rpc) => Arc::new(RpcKeyRegistry::new(rpc.clone())),
        }
    }

    pub fn orchestrator(&self) -> Result<Orchestrator> {
        self.validate()?;
        Ok(Orchestrator::new(self.build_registry())
            .with_base_url(&self.provider_base_url)
            .with_policy(self.retry.policy()))
    }

    /// Wire registry, policy, and models into a [`Generator`].
    ///
    /// Each call builds a new registry. Clone the returned generator to share
    /// one pool, and its exhaustion state, across workers.
    pub fn generator(&self) -> Result<Generator> {
        Ok(Generator::new(self.orchestrator()?)
            .with_models(self.models.clone())
            .with_poll_interval(self.retry.poll_interval()))
    }
}
