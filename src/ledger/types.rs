use crate::rollout::Role;
use crate::tools::{ExecutionMode, Tier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Planning details recorded once the plan for a run is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningMetadata {
    pub plan_id: String,
    pub workflow_type: String,
    pub execution_model: String,
    pub intent_class: String,
    pub planned_nodes: usize,
    pub parallel_nodes: usize,
    pub branch_count: usize,
    pub approval_nodes: usize,
}

/// Metadata attached to a run when it completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verifier_issues: Vec<String>,
    /// Gates still pending when the turn ended; their calls resume in a
    /// later turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_gates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub role: Role,
    pub user_id: String,
    pub goal_text: String,
    pub status: RunStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_ms: Option<u64>,
    pub retry_count: u32,
    pub planning: Option<PlanningMetadata>,
    pub metadata: RunMetadata,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    Executed,
    Failed,
    ApprovalRequired,
    Denied,
}

/// Step data supplied by the router; the ledger assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStep {
    pub router: String,
    pub action: String,
    pub tier: Tier,
    pub params: Value,
    pub result: Value,
    pub status: StepStatus,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub node_id: Option<String>,
    pub branch_id: Option<String>,
    pub join_key: Option<String>,
    pub execution_mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub run_id: String,
    pub router: String,
    pub action: String,
    pub tier: Tier,
    pub params: Value,
    pub result: Value,
    pub status: StepStatus,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub node_id: Option<String>,
    pub branch_id: Option<String>,
    pub join_key: Option<String>,
    pub execution_mode: Option<ExecutionMode>,
    pub recorded_at: String,
}

impl Step {
    pub fn tool_name(&self) -> String {
        crate::tools::tool_name(&self.router, &self.action)
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Executed
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGate {
    pub run_id: String,
    pub role: Role,
    pub user_id: String,
    pub tool_name: String,
    pub params: Value,
    pub params_fingerprint: String,
    pub node_id: Option<String>,
    pub branch_id: Option<String>,
    pub execution_mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub gate_id: String,
    pub run_id: String,
    pub role: Role,
    pub user_id: String,
    pub tool_name: String,
    pub params: Value,
    pub params_fingerprint: String,
    pub status: GateStatus,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub decided_by: Option<String>,
    pub reason: Option<String>,
    /// Set when an approved gate authorizes its single execution.
    pub consumed_at: Option<String>,
    pub node_id: Option<String>,
    pub branch_id: Option<String>,
    pub execution_mode: Option<ExecutionMode>,
}

impl Gate {
    pub fn is_pending(&self) -> bool {
        self.status == GateStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResolution {
    pub status: GateStatus,
    pub decided_by: String,
    pub reason: Option<String>,
}

/// Selection criteria for gate queries. Empty filter matches every gate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateFilter {
    pub run_id: Option<String>,
    pub role: Option<Role>,
    pub status: Option<GateStatus>,
}

impl GateFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(GateStatus::Pending),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn for_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn matches(&self, gate: &Gate) -> bool {
        self.run_id.as_ref().is_none_or(|id| *id == gate.run_id)
            && self.role.is_none_or(|role| role == gate.role)
            && self.status.is_none_or(|status| status == gate.status)
    }
}
