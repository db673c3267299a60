//! Feature gate: resolves which planned execution paths are active for a role.

use crate::config::RolloutConfig;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Recruiter,
    Carrier,
    Driver,
}

/// Resolved rollout state for one role, computed once per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolloutDecision {
    pub role: Role,
    pub dag_planning: bool,
    pub parallel_reads: bool,
    pub verifier: bool,
    pub branch_aware_approvals: bool,
}

impl RolloutDecision {
    /// The planned path runs only when planning is on; parallel reads and the
    /// verifier are refinements of it and never apply to the legacy path.
    pub fn uses_planned_path(&self) -> bool {
        self.dag_planning
    }

    pub fn executes_planned_reads(&self) -> bool {
        self.dag_planning && self.parallel_reads
    }

    pub fn verifies(&self) -> bool {
        self.dag_planning && self.verifier
    }
}

pub struct FeatureGate<'a> {
    rollout: &'a RolloutConfig,
}

impl<'a> FeatureGate<'a> {
    pub fn new(rollout: &'a RolloutConfig) -> Self {
        Self { rollout }
    }

    pub fn dag_planning_enabled(&self, role: Role) -> bool {
        self.rollout.dag_planning_enabled && self.rollout.dag_planning_enabled_roles.contains(&role)
    }

    pub fn parallel_reads_enabled(&self, role: Role) -> bool {
        self.rollout.parallel_read_branches_enabled
            && self
                .rollout
                .parallel_read_branches_enabled_roles
                .contains(&role)
    }

    pub fn verifier_enabled(&self, role: Role) -> bool {
        self.rollout.agent_verifier_enabled
            && self.rollout.agent_verifier_enabled_roles.contains(&role)
    }

    pub fn decide(&self, role: Role) -> RolloutDecision {
        RolloutDecision {
            role,
            dag_planning: self.dag_planning_enabled(role),
            parallel_reads: self.parallel_reads_enabled(role),
            verifier: self.verifier_enabled(role),
            branch_aware_approvals: self.rollout.branch_aware_approvals_enabled,
        }
    }
}
