use super::node::NodeRunner;
use super::report::{NodeResult, PlanExecutionReport};
use crate::config::ExecutorConfig;
use crate::observability::Observer;
use crate::planner::ExecutionPlan;
use crate::tools::{ActionRegistry, ToolContext};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub type ExecutionFuture<'a> = Pin<Box<dyn Future<Output = PlanExecutionReport> + Send + 'a>>;

pub trait PlanExecutor: Send + Sync {
    /// Run the plan's read-only nodes. Node failures are reported in the
    /// returned report and never abort the plan.
    fn execute_planned_read_nodes<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        ctx: &'a ToolContext,
    ) -> ExecutionFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Deferred,
}

impl Slot {
    fn finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

/// Branch-parallel executor for read nodes.
///
/// A node starts once everything it waits for has finished. At most one node
/// per branch is in flight, and all plans share one worker budget.
pub struct DagExecutor {
    runner: NodeRunner,
    workers: Arc<Semaphore>,
    digest_chars: usize,
}

impl DagExecutor {
    pub fn new(
        registry: Arc<ActionRegistry>,
        observer: Arc<dyn Observer>,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            runner: NodeRunner::new(registry, observer, config.node_timeout()),
            workers: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            digest_chars: config.summary_digest_chars,
        }
    }

    async fn execute(&self, plan: &ExecutionPlan, ctx: &ToolContext) -> PlanExecutionReport {
        let graph = plan.graph();
        let count = plan.nodes().len();
        let mut report = PlanExecutionReport::new(plan.plan_id());
        let mut slots = vec![Slot::Pending; count];
        let mut results: Vec<Option<NodeResult>> = vec![None; count];

        let deferred =
            graph.downstream_closure((0..count).filter(|&index| !plan.node(index).is_read()));
        for &index in graph.order() {
            if deferred.contains(&index) {
                slots[index] = Slot::Deferred;
                report.deferred_nodes.push(plan.node(index).node_id.clone());
            }
        }

        let mut busy_branches: HashSet<String> = HashSet::new();
        let mut in_flight = JoinSet::new();
        let mut task_nodes: HashMap<tokio::task::Id, usize> = HashMap::new();

        loop {
            let mut progressed = true;
            while progressed {
                progressed = false;
                for &index in graph.order() {
                    if slots[index] != Slot::Pending
                        || !graph.wait_for(index).iter().all(|&w| slots[w].finished())
                    {
                        continue;
                    }

                    let node = plan.node(index);
                    if let Some(reason) = blocked_by(plan, index, &slots) {
                        slots[index] = Slot::Skipped;
                        self.runner.skipped(&ctx.run_id, &node.node_id, &reason);
                        report.skip(&node.node_id, &node.tool_name(), reason);
                        progressed = true;
                        continue;
                    }
                    if !busy_branches.insert(node.branch_id.clone()) {
                        continue;
                    }

                    slots[index] = Slot::Running;
                    let upstream = graph
                        .wait_for(index)
                        .iter()
                        .filter_map(|&w| results[w].as_ref().map(NodeResult::upstream))
                        .collect();
                    let node_ctx = ctx.for_node(node.binding(), upstream);
                    let runner = self.runner.clone();
                    let workers = Arc::clone(&self.workers);
                    let node = node.clone();
                    let task = in_flight.spawn(async move {
                        let _permit = workers.acquire_owned().await.ok();
                        runner.run(node, node_ctx).await
                    });
                    task_nodes.insert(task.id(), index);
                }
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((task_id, result)) => {
                    let Some(index) = task_nodes.remove(&task_id) else {
                        continue;
                    };
                    busy_branches.remove(&plan.node(index).branch_id);
                    slots[index] = if result.success {
                        Slot::Succeeded
                    } else {
                        Slot::Failed
                    };
                    results[index] = Some(result.clone());
                    report.record(result);
                }
                Err(error) => {
                    tracing::error!(plan_id = %plan.plan_id(), error = %error, "plan executor task failed");
                    let Some(index) = task_nodes.remove(&error.id()) else {
                        continue;
                    };
                    let node = plan.node(index);
                    busy_branches.remove(&node.branch_id);
                    slots[index] = Slot::Skipped;
                    let reason = format!("node task aborted: {error}");
                    self.runner.skipped(&ctx.run_id, &node.node_id, &reason);
                    report.skip(&node.node_id, &node.tool_name(), reason);
                }
            }
        }

        for &index in graph.order() {
            if matches!(slots[index], Slot::Pending | Slot::Running) {
                let node = plan.node(index);
                report.skip(&node.node_id, &node.tool_name(), "not executed");
            }
        }

        report.render_summary(self.digest_chars);
        tracing::info!(
            run_id = %ctx.run_id,
            plan_id = %plan.plan_id(),
            executed = report.executed_nodes.len(),
            failed = report.failed_nodes.len(),
            skipped = report.skipped_nodes.len(),
            deferred = report.deferred_nodes.len(),
            "planned read nodes finished"
        );
        report
    }
}

fn blocked_by(plan: &ExecutionPlan, index: usize, slots: &[Slot]) -> Option<String> {
    plan.graph()
        .dependencies(index)
        .iter()
        .find_map(|&dep| match slots[dep] {
            Slot::Failed => Some(format!("dependency {} failed", plan.node(dep).node_id)),
            Slot::Skipped => Some(format!("dependency {} skipped", plan.node(dep).node_id)),
            _ => None,
        })
}

impl PlanExecutor for DagExecutor {
    fn execute_planned_read_nodes<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        ctx: &'a ToolContext,
    ) -> ExecutionFuture<'a> {
        Box::pin(self.execute(plan, ctx))
    }
}
