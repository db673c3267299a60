use super::graph::{GraphNode, PlanGraph};
use crate::error::PlanningError;
use crate::ledger::PlanningMetadata;
use crate::tools::{ExecutionMode, NodeBinding, Tier, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    ToolAction,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionModel {
    /// Read nodes fan out across branches.
    PlannedParallel,
    /// Every node runs one at a time in dependency order.
    PlannedSequential,
}

/// One planned router call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub node_id: String,
    pub kind: NodeKind,
    pub tool: String,
    pub action: String,
    pub params: Value,
    pub depends_on: Vec<String>,
    pub branch_id: String,
    pub join_key: String,
    pub execution_mode: ExecutionMode,
    pub tier: Tier,
    pub verifier_required: bool,
    pub approval_required: bool,
}

impl PlanNode {
    /// A node with mode and approval flag derived from `tier`.
    pub fn new(
        node_id: impl Into<String>,
        tool: impl Into<String>,
        action: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            kind: NodeKind::ToolAction,
            tool: tool.into(),
            action: action.into(),
            params: Value::Object(serde_json::Map::new()),
            depends_on: Vec::new(),
            branch_id: String::new(),
            join_key: String::new(),
            execution_mode: ExecutionMode::for_tier(tier),
            tier,
            verifier_required: false,
            approval_required: tier.requires_approval(),
        }
    }

    #[must_use]
    pub fn params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|dep| (*dep).to_string()).collect();
        self
    }

    #[must_use]
    pub fn branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = branch_id.into();
        self
    }

    #[must_use]
    pub fn join(mut self, join_key: impl Into<String>) -> Self {
        self.join_key = join_key.into();
        self
    }

    #[must_use]
    pub fn verifier_required(mut self, required: bool) -> Self {
        self.verifier_required = required;
        self
    }

    pub fn tool_name(&self) -> String {
        crate::tools::tool_name(&self.tool, &self.action)
    }

    pub fn is_read(&self) -> bool {
        self.tier.is_read()
    }

    pub fn call(&self) -> ToolCall {
        ToolCall::new(self.tool.clone(), self.action.clone(), self.params.clone())
    }

    pub fn binding(&self) -> NodeBinding {
        NodeBinding {
            node_id: self.node_id.clone(),
            branch_id: self.branch_id.clone(),
            join_key: self.join_key.clone(),
            execution_mode: self.execution_mode,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub planned_nodes: usize,
    pub parallel_nodes: usize,
    pub branch_count: usize,
    pub approval_nodes: usize,
}

/// Immutable, validated plan for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    plan_id: String,
    workflow_type: String,
    intent_class: String,
    execution_model: ExecutionModel,
    nodes: Vec<PlanNode>,
    summary: PlanSummary,
    #[serde(skip)]
    graph: PlanGraph,
}

impl ExecutionPlan {
    /// Validate `nodes` and freeze them into a plan.
    ///
    /// Rejects cyclic or dangling dependencies, empty branch or join keys,
    /// and nodes whose scheduling flags disagree with their tier.
    pub fn new(
        workflow_type: impl Into<String>,
        intent_class: impl Into<String>,
        execution_model: ExecutionModel,
        nodes: Vec<PlanNode>,
    ) -> Result<Self, PlanningError> {
        for node in &nodes {
            if node.branch_id.trim().is_empty() || node.join_key.trim().is_empty() {
                return Err(PlanningError::InvalidGraph(format!(
                    "node {} is missing a branch id or join key",
                    node.node_id
                )));
            }
            if node.approval_required != node.tier.requires_approval() {
                return Err(PlanningError::InvalidGraph(format!(
                    "node {} approval flag does not match tier {}",
                    node.node_id, node.tier
                )));
            }
            if node.execution_mode == ExecutionMode::ParallelSafe && !node.tier.is_read() {
                return Err(PlanningError::InvalidGraph(format!(
                    "node {} is parallel_safe but has tier {}",
                    node.node_id, node.tier
                )));
            }
        }

        let graph_nodes: Vec<GraphNode<'_>> = nodes
            .iter()
            .map(|node| GraphNode {
                id: &node.node_id,
                depends_on: &node.depends_on,
                join_key: &node.join_key,
            })
            .collect();
        let graph = PlanGraph::build(&graph_nodes)?;

        let branches: BTreeSet<&str> = nodes.iter().map(|n| n.branch_id.as_str()).collect();
        let summary = PlanSummary {
            planned_nodes: nodes.len(),
            parallel_nodes: nodes
                .iter()
                .filter(|n| n.execution_mode == ExecutionMode::ParallelSafe)
                .count(),
            branch_count: branches.len(),
            approval_nodes: nodes.iter().filter(|n| n.approval_required).count(),
        };

        Ok(Self {
            plan_id: format!("plan_{}", Uuid::new_v4().simple()),
            workflow_type: workflow_type.into(),
            intent_class: intent_class.into(),
            execution_model,
            nodes,
            summary,
            graph,
        })
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn workflow_type(&self) -> &str {
        &self.workflow_type
    }

    pub fn intent_class(&self) -> &str {
        &self.intent_class
    }

    pub fn execution_model(&self) -> ExecutionModel {
        self.execution_model
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &PlanNode {
        &self.nodes[index]
    }

    pub fn index_of(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.node_id == node_id)
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }

    pub fn graph(&self) -> &PlanGraph {
        &self.graph
    }

    pub fn planning_metadata(&self) -> PlanningMetadata {
        PlanningMetadata {
            plan_id: self.plan_id.clone(),
            workflow_type: self.workflow_type.clone(),
            execution_model: self.execution_model.to_string(),
            intent_class: self.intent_class.clone(),
            planned_nodes: self.summary.planned_nodes,
            parallel_nodes: self.summary.parallel_nodes,
            branch_count: self.summary.branch_count,
            approval_nodes: self.summary.approval_nodes,
        }
    }
}
