use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// "none" | "log"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Max level for the CLI's `tracing` subscriber.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_backend() -> String {
    "log".into()
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            log_level: default_log_level(),
        }
    }
}
