use super::report::NodeResult;
use crate::ledger::{NewStep, StepStatus};
use crate::observability::{Observer, ObserverEvent};
use crate::planner::PlanNode;
use crate::tools::{ActionRegistry, ToolContext, ToolOutcome};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Dispatches a single plan node through the router with a deadline.
///
/// The router call runs in its own task, so a panicking handler surfaces as a
/// failed node instead of tearing down the plan.
#[derive(Clone)]
pub struct NodeRunner {
    registry: Arc<ActionRegistry>,
    observer: Arc<dyn Observer>,
    timeout: Duration,
}

impl NodeRunner {
    pub fn new(
        registry: Arc<ActionRegistry>,
        observer: Arc<dyn Observer>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            observer,
            timeout,
        }
    }

    pub async fn run(&self, node: PlanNode, ctx: ToolContext) -> NodeResult {
        let started = Instant::now();
        let run_id = ctx.run_id.clone();
        let registry = Arc::clone(&self.registry);
        let limit = self.timeout;
        let call = node.call();

        tracing::debug!(run_id = %run_id, node_id = %node.node_id, tool = %node.tool_name(), "dispatching plan node");
        let task = tokio::spawn(async move {
            tokio::time::timeout(limit, registry.execute_tool(call, &ctx)).await
        });

        let mut result = NodeResult {
            node_id: node.node_id.clone(),
            branch_id: node.branch_id.clone(),
            join_key: node.join_key.clone(),
            tool_name: node.tool_name(),
            success: false,
            result: Value::Null,
            error: None,
            gate_id: None,
            latency_ms: 0,
        };

        match task.await {
            Ok(Ok(Ok(ToolOutcome::Completed { result: value, .. }))) => {
                result.success = true;
                result.result = value;
            }
            Ok(Ok(Ok(ToolOutcome::ApprovalRequired { gate_id, .. }))) => {
                result.gate_id = Some(gate_id);
            }
            Ok(Ok(Err(error))) => {
                result.error = Some(error.to_string());
            }
            Ok(Err(_elapsed)) => {
                let message = format!("timed out after {} ms", limit.as_millis());
                self.log_failure(&run_id, &node, &message, limit).await;
                result.error = Some(message);
            }
            Err(join_error) => {
                tracing::error!(run_id = %run_id, node_id = %node.node_id, error = %join_error, "plan node task aborted");
                let message = format!("node task aborted: {join_error}");
                self.log_failure(&run_id, &node, &message, started.elapsed())
                    .await;
                result.error = Some(message);
            }
        }

        let elapsed = started.elapsed();
        result.latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.observer.record_event(&ObserverEvent::NodeFinished {
            run_id,
            node_id: result.node_id.clone(),
            tool_name: result.tool_name.clone(),
            duration: elapsed,
            success: result.success,
        });
        result
    }

    /// Record a failed step for a call the router never finished: cut off by
    /// the deadline, or aborted by a panicking handler.
    async fn log_failure(&self, run_id: &str, node: &PlanNode, message: &str, spent: Duration) {
        let step = NewStep {
            router: node.tool.clone(),
            action: node.action.clone(),
            tier: node.tier,
            params: node.params.clone(),
            result: Value::Null,
            status: StepStatus::Failed,
            latency_ms: u64::try_from(spent.as_millis()).unwrap_or(u64::MAX),
            error: Some(message.to_string()),
            node_id: Some(node.node_id.clone()),
            branch_id: Some(node.branch_id.clone()),
            join_key: Some(node.join_key.clone()),
            execution_mode: Some(node.execution_mode),
        };
        if let Err(error) = self.registry.ledger().log_step(run_id, step).await {
            tracing::warn!(run_id = %run_id, node_id = %node.node_id, error = %error, "failed to record failed node");
        }
    }

    pub fn skipped(&self, run_id: &str, node_id: &str, reason: &str) {
        tracing::info!(run_id = %run_id, node_id = %node_id, reason = %reason, "plan node skipped");
        self.observer.record_event(&ObserverEvent::NodeSkipped {
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
            reason: reason.to_string(),
        });
    }
}
