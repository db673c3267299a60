use crate::rollout::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

/// Risk tier of a router action, fixed at registration time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    Read,
    ExecuteLow,
    ExecuteHigh,
}

impl Tier {
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }

    /// Only `execute_high` actions pass through an approval gate.
    pub fn requires_approval(self) -> bool {
        matches!(self, Self::ExecuteHigh)
    }
}

/// Scheduling class of a plan node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionMode {
    ParallelSafe,
    SequentialOnly,
}

impl ExecutionMode {
    pub fn for_tier(tier: Tier) -> Self {
        if tier.is_read() {
            Self::ParallelSafe
        } else {
            Self::SequentialOnly
        }
    }
}

/// A single router invocation: `router.action(params)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub router: String,
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl ToolCall {
    pub fn new(router: impl Into<String>, action: impl Into<String>, params: Value) -> Self {
        Self {
            router: router.into(),
            action: action.into(),
            params,
        }
    }

    pub fn tool_name(&self) -> String {
        tool_name(&self.router, &self.action)
    }
}

pub fn tool_name(router: &str, action: &str) -> String {
    format!("{router}.{action}")
}

/// Position of a call inside an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBinding {
    pub node_id: String,
    pub branch_id: String,
    pub join_key: String,
    pub execution_mode: ExecutionMode,
}

/// Result of an upstream plan node, handed to downstream handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamResult {
    pub node_id: String,
    pub tool_name: String,
    pub join_key: String,
    pub success: bool,
    pub result: Value,
}

/// Outcome of a router call that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutcome {
    Completed {
        tool_name: String,
        result: Value,
    },
    /// The handler was not invoked; resubmit the same call with the gate id
    /// once the gate is approved.
    ApprovalRequired {
        tool_name: String,
        gate_id: String,
    },
}

impl ToolOutcome {
    pub fn tool_name(&self) -> &str {
        match self {
            Self::Completed { tool_name, .. } | Self::ApprovalRequired { tool_name, .. } => {
                tool_name
            }
        }
    }

    pub fn gate_id(&self) -> Option<&str> {
        match self {
            Self::ApprovalRequired { gate_id, .. } => Some(gate_id),
            Self::Completed { .. } => None,
        }
    }
}

/// Description of one registered action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub tier: Tier,
}

/// Description of a router as visible to one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSpec {
    pub name: String,
    pub allowed_roles: Vec<Role>,
    pub actions: Vec<ActionSpec>,
}
