// SPDX-License-Identifier: Apache-2.0

//! YAML runtime configuration with strict validation.
//!
//! Any invalid field results in a ConfigError that prevents startup.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::ServiceName;

/// Raw configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawRuntimeConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_drain_warn_ms")]
    drain_warn_ms: u64,
    #[serde(default = "default_slow_init_warn_ms")]
    slow_init_warn_ms: u64,
}

fn default_drain_warn_ms() -> u64 {
    5000
}

fn default_slow_init_warn_ms() -> u64 {
    1000
}

impl Default for RawRuntimeConfig {
    fn default() -> Self {
        Self {
            name: None,
            drain_warn_ms: default_drain_warn_ms(),
            slow_init_warn_ms: default_slow_init_warn_ms(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    runtime: RawRuntimeConfig,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Optional name for this runtime instance, used in log output.
    pub name: Option<ServiceName>,
    /// Warn when a shutdown drain has been waiting longer than this.
    /// 0 disables the warning.
    pub drain_warn_ms: u64,
    /// Warn when initialization of an instance took longer than this.
    /// 0 disables the warning.
    pub slow_init_warn_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: None,
            drain_warn_ms: default_drain_warn_ms(),
            slow_init_warn_ms: default_slow_init_warn_ms(),
        }
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<RuntimeConfig, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;

        Self::validate(raw.runtime)
    }

    fn validate(raw: RawRuntimeConfig) -> Result<RuntimeConfig, ConfigError> {
        let name = match raw.name {
            Some(name) => Some(ServiceName::new(name)?),
            None => None,
        };

        Ok(RuntimeConfig {
            name,
            drain_warn_ms: raw.drain_warn_ms,
            slow_init_warn_ms: raw.slow_init_warn_ms,
        })
    }
}
