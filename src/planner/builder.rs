use super::intent::IntentClassifier;
use super::types::{ExecutionModel, ExecutionPlan, PlanNode};
use super::workflows::{NodeTemplate, WorkflowCatalog};
use crate::error::PlanningError;
use crate::rollout::Role;
use crate::tools::ActionRegistry;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Turn-level inputs that shape the plan.
#[derive(Debug, Clone, Default)]
pub struct PlanningContext {
    /// Parallel read branches are enabled for this role.
    pub parallel_reads: bool,
    /// Skip classification and plan for this intent class.
    pub intent_hint: Option<String>,
}

pub type PlanFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecutionPlan, PlanningError>> + Send + 'a>>;

pub trait ExecutionPlanner: Send + Sync {
    fn build_execution_plan<'a>(
        &'a self,
        role: Role,
        task_text: &'a str,
        ctx: &'a PlanningContext,
    ) -> PlanFuture<'a>;
}

/// Builds plans from the workflow catalog, taking tiers from the registry.
pub struct PlanBuilder {
    catalog: WorkflowCatalog,
    classifier: Arc<dyn IntentClassifier>,
    registry: Arc<ActionRegistry>,
}

impl PlanBuilder {
    pub fn new(
        catalog: WorkflowCatalog,
        classifier: Arc<dyn IntentClassifier>,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            catalog,
            classifier,
            registry,
        }
    }

    fn plan(
        &self,
        role: Role,
        task_text: &str,
        ctx: &PlanningContext,
    ) -> Result<ExecutionPlan, PlanningError> {
        let workflow = self
            .catalog
            .get(role)
            .ok_or_else(|| PlanningError::NoWorkflowForRole {
                role: role.to_string(),
            })?;

        let intent_class = match &ctx.intent_hint {
            Some(hint) => hint.clone(),
            None => self.classifier.classify(role, task_text).intent_class,
        };
        let templates = workflow.templates_for(&intent_class);
        if templates.is_empty() {
            return Err(PlanningError::InvalidGraph(format!(
                "workflow {} has no nodes for intent {intent_class}",
                workflow.workflow_type
            )));
        }

        let branches = assign_branches(templates);
        let mut nodes = Vec::with_capacity(templates.len());
        for template in templates {
            let tier = self
                .registry
                .tier_of(&template.router, &template.action)
                .ok_or_else(|| PlanningError::UnknownAction {
                    node_id: template.node_id.clone(),
                    tool: template.router.clone(),
                    action: template.action.clone(),
                })?;
            if !self.registry.router_allows(&template.router, role) {
                return Err(PlanningError::InvalidGraph(format!(
                    "node {} uses router {} which role {role} cannot call",
                    template.node_id, template.router
                )));
            }

            let deps: Vec<&str> = template.depends_on.iter().map(String::as_str).collect();
            nodes.push(
                PlanNode::new(&template.node_id, &template.router, &template.action, tier)
                    .params(template.params.clone())
                    .depends_on(&deps)
                    .branch(branches.get(&template.node_id).cloned().unwrap_or_default())
                    .join(
                        template
                            .join_key
                            .clone()
                            .unwrap_or_else(|| workflow.workflow_type.clone()),
                    )
                    .verifier_required(tier.is_read() && template.feeds_synthesis),
            );
        }

        let model = if ctx.parallel_reads {
            ExecutionModel::PlannedParallel
        } else {
            ExecutionModel::PlannedSequential
        };
        let plan = ExecutionPlan::new(&workflow.workflow_type, &intent_class, model, nodes)?;

        tracing::debug!(
            plan_id = %plan.plan_id(),
            workflow = %plan.workflow_type(),
            intent = %intent_class,
            nodes = plan.summary().planned_nodes,
            branches = plan.summary().branch_count,
            "execution plan built"
        );
        Ok(plan)
    }
}

impl ExecutionPlanner for PlanBuilder {
    fn build_execution_plan<'a>(
        &'a self,
        role: Role,
        task_text: &'a str,
        ctx: &'a PlanningContext,
    ) -> PlanFuture<'a> {
        Box::pin(async move { self.plan(role, task_text, ctx) })
    }
}

/// Roots open a branch. A node with a single dependency continues that
/// dependency's branch if it is the first to do so; fan-ins and later
/// siblings open a new branch.
fn assign_branches(templates: &[NodeTemplate]) -> HashMap<String, String> {
    let mut assigned: HashMap<String, String> = HashMap::new();
    let mut continued: HashSet<String> = HashSet::new();
    let mut next = 0_usize;

    for template in templates {
        let inherited = match template.depends_on.as_slice() {
            [dep] if !continued.contains(dep) => assigned.get(dep).cloned(),
            _ => None,
        };
        let branch = match (inherited, template.depends_on.first()) {
            (Some(branch), Some(dep)) => {
                continued.insert(dep.clone());
                branch
            }
            _ => {
                next += 1;
                format!("b{next}")
            }
        };
        assigned.insert(template.node_id.clone(), branch);
    }
    assigned
}
