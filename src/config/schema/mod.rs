mod core;
mod executor;
mod ledger;
mod observability;
mod rollout;

pub use core::Config;
pub use executor::ExecutorConfig;
pub use ledger::LedgerConfig;
pub use observability::ObservabilityConfig;
pub use rollout::RolloutConfig;
