use super::traits::{Observer, ObserverEvent};

/// Observer that discards every event.
pub struct NoopObserver;

impl Observer for NoopObserver {
    #[inline(always)]
    fn record_event(&self, _event: &ObserverEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_name() {
        assert_eq!(NoopObserver.name(), "noop");
    }

    #[test]
    fn noop_record_event_does_not_panic() {
        NoopObserver.record_event(&ObserverEvent::PlanningFallback {
            run_id: "run_1".into(),
            reason: "no workflow".into(),
        });
    }
}
