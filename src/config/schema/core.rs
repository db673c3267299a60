mod env_overrides;
mod loader;

use super::{ExecutorConfig, LedgerConfig, ObservabilityConfig, RolloutConfig};
use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub rollout: RolloutConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".agentgate").join("config.toml"),
            rollout: RolloutConfig::default(),
            executor: ExecutorConfig::default(),
            ledger: LedgerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|error| ConfigError::Load(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.executor.validate()?;
        match self.observability.backend.as_str() {
            "log" | "none" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "observability.backend must be \"log\" or \"none\", got \"{other}\""
            ))),
        }
    }
}
