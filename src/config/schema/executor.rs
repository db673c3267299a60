use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Worker budget for concurrently running read nodes.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,
    /// Max characters of a node result kept in the summary trace.
    #[serde(default = "default_summary_digest_chars")]
    pub summary_digest_chars: usize,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_node_timeout_ms() -> u64 {
    15_000
}

fn default_summary_digest_chars() -> usize {
    240
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            node_timeout_ms: default_node_timeout_ms(),
            summary_digest_chars: default_summary_digest_chars(),
        }
    }
}

impl ExecutorConfig {
    pub fn node_timeout(&self) -> Duration {
        Duration::from_millis(self.node_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "executor.max_concurrency must be >= 1".into(),
            ));
        }
        if self.node_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "executor.node_timeout_ms must be >= 1".into(),
            ));
        }
        if self.summary_digest_chars < 16 {
            return Err(ConfigError::Validation(
                "executor.summary_digest_chars must be >= 16".into(),
            ));
        }
        Ok(())
    }
}
