pub mod schema;

pub use schema::{
    Config, ExecutorConfig, LedgerConfig, ObservabilityConfig, RolloutConfig,
};
