use std::time::Duration;

/// Lifecycle events emitted while a turn moves through planning, execution,
/// approval and verification.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    RunStarted {
        run_id: String,
        role: String,
        path: String,
    },
    PlanBuilt {
        run_id: String,
        plan_id: String,
        workflow_type: String,
        planned_nodes: usize,
        parallel_nodes: usize,
    },
    PlanningFallback {
        run_id: String,
        reason: String,
    },
    NodeFinished {
        run_id: String,
        node_id: String,
        tool_name: String,
        duration: Duration,
        success: bool,
    },
    NodeSkipped {
        run_id: String,
        node_id: String,
        reason: String,
    },
    GateOpened {
        run_id: String,
        gate_id: String,
        tool_name: String,
    },
    GateResolved {
        gate_id: String,
        status: String,
    },
    Verified {
        run_id: String,
        status: String,
        issues: usize,
    },
    RunCompleted {
        run_id: String,
        status: String,
        duration: Duration,
    },
}

/// Sink for orchestration lifecycle events.
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Human-readable backend name
    fn name(&self) -> &str;
}
