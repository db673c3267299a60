use crate::rollout::Role;
use serde::{Deserialize, Serialize};

/// Per-role rollout matrix for the planned execution paths.
///
/// Every path is off unless its global switch is on *and* the role is listed.
/// The default value is the conservative state: all roles stay on the legacy
/// sequential path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolloutConfig {
    #[serde(default)]
    pub dag_planning_enabled: bool,
    #[serde(default)]
    pub dag_planning_enabled_roles: Vec<Role>,
    #[serde(default)]
    pub parallel_read_branches_enabled: bool,
    #[serde(default)]
    pub parallel_read_branches_enabled_roles: Vec<Role>,
    #[serde(default)]
    pub agent_verifier_enabled: bool,
    #[serde(default)]
    pub agent_verifier_enabled_roles: Vec<Role>,
    #[serde(default)]
    pub branch_aware_approvals_enabled: bool,
}

impl RolloutConfig {
    /// Planning, parallel reads and verification enabled for `roles` only.
    pub fn planned_for(roles: &[Role]) -> Self {
        Self {
            dag_planning_enabled: true,
            dag_planning_enabled_roles: roles.to_vec(),
            parallel_read_branches_enabled: true,
            parallel_read_branches_enabled_roles: roles.to_vec(),
            agent_verifier_enabled: true,
            agent_verifier_enabled_roles: roles.to_vec(),
            branch_aware_approvals_enabled: false,
        }
    }

    pub fn with_branch_aware_approvals(mut self, enabled: bool) -> Self {
        self.branch_aware_approvals_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rollout_disables_every_path() {
        let rollout = RolloutConfig::default();
        assert!(!rollout.dag_planning_enabled);
        assert!(rollout.dag_planning_enabled_roles.is_empty());
        assert!(!rollout.parallel_read_branches_enabled);
        assert!(!rollout.agent_verifier_enabled);
        assert!(!rollout.branch_aware_approvals_enabled);
    }

    #[test]
    fn rollout_parses_snake_case_roles() {
        let rollout: RolloutConfig = toml::from_str(
            r#"
dag_planning_enabled = true
dag_planning_enabled_roles = ["admin", "recruiter"]
"#,
        )
        .unwrap();

        assert!(rollout.dag_planning_enabled);
        assert_eq!(
            rollout.dag_planning_enabled_roles,
            vec![Role::Admin, Role::Recruiter]
        );
        assert!(!rollout.agent_verifier_enabled);
    }

    #[test]
    fn rollout_rejects_unknown_role() {
        let parsed = toml::from_str::<RolloutConfig>(r#"dag_planning_enabled_roles = ["dispatcher"]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn planned_for_enables_all_three_paths() {
        let rollout = RolloutConfig::planned_for(&[Role::Admin]);
        assert!(rollout.dag_planning_enabled);
        assert!(rollout.parallel_read_branches_enabled);
        assert!(rollout.agent_verifier_enabled);
        assert_eq!(rollout.agent_verifier_enabled_roles, vec![Role::Admin]);
    }
}
