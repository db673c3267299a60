use super::Config;
use crate::rollout::Role;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("AGENTGATE_MAX_CONCURRENCY")
            && let Ok(max) = value.parse::<usize>()
            && max > 0
        {
            self.executor.max_concurrency = max;
        }

        if let Ok(value) = std::env::var("AGENTGATE_NODE_TIMEOUT_MS")
            && let Ok(timeout_ms) = value.parse::<u64>()
            && timeout_ms > 0
        {
            self.executor.node_timeout_ms = timeout_ms;
        }

        if let Ok(path) = std::env::var("AGENTGATE_JOURNAL")
            && !path.is_empty()
        {
            self.ledger.journal_path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("AGENTGATE_LOG")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }

        if let Ok(list) = std::env::var("AGENTGATE_DAG_ROLES") {
            let roles = parse_role_list(&list);
            if !roles.is_empty() {
                self.rollout.dag_planning_enabled = true;
                self.rollout.dag_planning_enabled_roles.clone_from(&roles);
                self.rollout.parallel_read_branches_enabled = true;
                self.rollout
                    .parallel_read_branches_enabled_roles
                    .clone_from(&roles);
                self.rollout.agent_verifier_enabled = true;
                self.rollout.agent_verifier_enabled_roles = roles;
            }
        }
    }
}

/// Unknown entries are dropped with a warning rather than failing startup.
fn parse_role_list(list: &str) -> Vec<Role> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!(role = entry, "ignoring unknown role in AGENTGATE_DAG_ROLES");
                None
            }
        })
        .collect()
}
