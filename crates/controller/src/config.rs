//! Controller configuration

use anyhow::{Context, Result};
use rightsizing_lib::{Options, DEFAULT_CONFIG_NAMESPACE};
use serde::Deserialize;
use std::time::Duration;

/// Prefix of every controller environment variable
pub const ENV_PREFIX: &str = "RIGHTSIZING";

/// Controller configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub namespace_enabled: bool,

    /// Binding namespace for namespace right-sizing; empty means the default
    #[serde(default)]
    pub namespace_binding: String,

    #[serde(default)]
    pub virtualization_enabled: bool,

    #[serde(default)]
    pub virtualization_binding: String,

    /// Namespace holding the configuration records
    #[serde(default = "default_config_namespace")]
    pub config_namespace: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Periodic resync interval in seconds
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
}

fn default_config_namespace() -> String {
    DEFAULT_CONFIG_NAMESPACE.to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_resync_interval() -> u64 {
    300
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace_enabled: false,
            namespace_binding: String::new(),
            virtualization_enabled: false,
            virtualization_binding: String::new(),
            config_namespace: default_config_namespace(),
            api_port: default_api_port(),
            resync_interval_secs: default_resync_interval(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from `RIGHTSIZING_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit environment source
    pub fn from_environment(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read controller environment")?;

        let mut loaded: Self = config
            .try_deserialize()
            .context("Invalid controller configuration")?;

        if loaded.config_namespace.is_empty() {
            loaded.config_namespace = default_config_namespace();
        }
        if loaded.resync_interval_secs == 0 {
            anyhow::bail!("{}_RESYNC_INTERVAL_SECS must be greater than zero", ENV_PREFIX);
        }
        Ok(loaded)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Desired state handed to the reconciler
    pub fn options(&self) -> Options {
        Options {
            namespace_enabled: self.namespace_enabled,
            namespace_binding: self.namespace_binding.clone(),
            virtualization_enabled: self.virtualization_enabled,
            virtualization_binding: self.virtualization_binding.clone(),
            config_namespace: self.config_namespace.clone(),
        }
    }
}
