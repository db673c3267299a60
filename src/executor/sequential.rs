use super::node::NodeRunner;
use super::report::{NodeResult, PlanExecutionReport};
use crate::config::ExecutorConfig;
use crate::observability::Observer;
use crate::planner::ExecutionPlan;
use crate::tools::{ActionRegistry, ToolContext};
use std::collections::HashSet;
use std::sync::Arc;

/// Runs plan nodes one at a time in dependency order.
///
/// Used for the whole plan when parallel reads are off, and for the nodes
/// the parallel phase deferred (mutations and whatever waits on them).
pub struct SequentialDispatcher {
    runner: NodeRunner,
    digest_chars: usize,
}

impl SequentialDispatcher {
    pub fn new(
        registry: Arc<ActionRegistry>,
        observer: Arc<dyn Observer>,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            runner: NodeRunner::new(registry, observer, config.node_timeout()),
            digest_chars: config.summary_digest_chars,
        }
    }

    /// Dispatch every node not yet accounted for in `report`.
    pub async fn dispatch(
        &self,
        plan: &ExecutionPlan,
        ctx: &ToolContext,
        report: &mut PlanExecutionReport,
    ) {
        let mut handled: HashSet<String> = report
            .results
            .iter()
            .map(|result| result.node_id.clone())
            .chain(report.skipped_nodes.iter().map(|s| s.node_id.clone()))
            .collect();

        for &index in plan.graph().order() {
            let node = plan.node(index);
            if handled.contains(&node.node_id) {
                continue;
            }
            handled.insert(node.node_id.clone());

            if let Some(reason) = unmet_dependency(plan, index, report) {
                self.runner.skipped(&ctx.run_id, &node.node_id, &reason);
                report.skip(&node.node_id, &node.tool_name(), reason);
                continue;
            }

            let upstream = plan
                .graph()
                .wait_for(index)
                .iter()
                .filter_map(|&w| report.result_for(&plan.node(w).node_id))
                .map(NodeResult::upstream)
                .collect();
            let result = self
                .runner
                .run(node.clone(), ctx.for_node(node.binding(), upstream))
                .await;
            report.record(result);
        }

        report.render_summary(self.digest_chars);
    }
}

fn unmet_dependency(
    plan: &ExecutionPlan,
    index: usize,
    report: &PlanExecutionReport,
) -> Option<String> {
    plan.graph().dependencies(index).iter().find_map(|&dep| {
        let dep_id = &plan.node(dep).node_id;
        match report.result_for(dep_id) {
            Some(result) if result.success => None,
            Some(result) if result.awaiting_approval() => {
                Some(format!("waiting on approval of {dep_id}"))
            }
            Some(_) => Some(format!("dependency {dep_id} failed")),
            None => Some(format!("dependency {dep_id} skipped")),
        }
    })
}
