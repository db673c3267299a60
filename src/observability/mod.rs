pub mod log;
pub mod noop;
pub mod traits;

pub use self::log::LogObserver;
pub use noop::NoopObserver;
pub use traits::{Observer, ObserverEvent};

use crate::config::ObservabilityConfig;
use std::sync::Arc;

/// Build the observer selected by `[observability] backend`.
pub fn create_observer(config: &ObservabilityConfig) -> Arc<dyn Observer> {
    match config.backend.as_str() {
        "log" => Arc::new(LogObserver::new()),
        "none" | "noop" => Arc::new(NoopObserver),
        other => {
            tracing::warn!(backend = %other, "unknown observability backend, falling back to noop");
            Arc::new(NoopObserver)
        }
    }
}
