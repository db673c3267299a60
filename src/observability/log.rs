use super::traits::{Observer, ObserverEvent};
use tracing::{info, warn};

/// Log-based observer backed by `tracing`.
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::RunStarted { run_id, role, path } => {
                info!(run_id = %run_id, role = %role, path = %path, "run.start");
            }
            ObserverEvent::PlanBuilt {
                run_id,
                plan_id,
                workflow_type,
                planned_nodes,
                parallel_nodes,
            } => {
                info!(
                    run_id = %run_id,
                    plan_id = %plan_id,
                    workflow = %workflow_type,
                    planned_nodes,
                    parallel_nodes,
                    "plan.built"
                );
            }
            ObserverEvent::PlanningFallback { run_id, reason } => {
                warn!(run_id = %run_id, reason = %reason, "plan.fallback");
            }
            ObserverEvent::NodeFinished {
                run_id,
                node_id,
                tool_name,
                duration,
                success,
            } => {
                info!(
                    run_id = %run_id,
                    node_id = %node_id,
                    tool = %tool_name,
                    duration_ms = millis(*duration),
                    success = success,
                    "node.finished"
                );
            }
            ObserverEvent::NodeSkipped {
                run_id,
                node_id,
                reason,
            } => {
                info!(run_id = %run_id, node_id = %node_id, reason = %reason, "node.skipped");
            }
            ObserverEvent::GateOpened {
                run_id,
                gate_id,
                tool_name,
            } => {
                info!(run_id = %run_id, gate_id = %gate_id, tool = %tool_name, "gate.opened");
            }
            ObserverEvent::GateResolved { gate_id, status } => {
                info!(gate_id = %gate_id, status = %status, "gate.resolved");
            }
            ObserverEvent::Verified {
                run_id,
                status,
                issues,
            } => {
                info!(run_id = %run_id, status = %status, issues, "run.verified");
            }
            ObserverEvent::RunCompleted {
                run_id,
                status,
                duration,
            } => {
                info!(
                    run_id = %run_id,
                    status = %status,
                    duration_ms = millis(*duration),
                    "run.completed"
                );
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
