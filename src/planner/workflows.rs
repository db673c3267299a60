//! Workflow catalog: per-role node templates keyed by intent class.

use crate::rollout::Role;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub node_id: String,
    pub router: String,
    pub action: String,
    pub params: Value,
    pub depends_on: Vec<String>,
    /// Join group; defaults to the workflow type.
    pub join_key: Option<String>,
    /// Downstream synthesis relies on this node's accuracy.
    pub feeds_synthesis: bool,
}

impl NodeTemplate {
    pub fn new(node_id: &str, router: &str, action: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            router: router.to_string(),
            action: action.to_string(),
            params: json!({}),
            depends_on: Vec::new(),
            join_key: None,
            feeds_synthesis: true,
        }
    }

    #[must_use]
    pub fn params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn after(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|dep| (*dep).to_string()).collect();
        self
    }

    #[must_use]
    pub fn join(mut self, join_key: &str) -> Self {
        self.join_key = Some(join_key.to_string());
        self
    }

    #[must_use]
    pub fn context_only(mut self) -> Self {
        self.feeds_synthesis = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefinition {
    pub workflow_type: String,
    intents: BTreeMap<String, Vec<NodeTemplate>>,
    default_nodes: Vec<NodeTemplate>,
}

impl WorkflowDefinition {
    pub fn new(workflow_type: &str, default_nodes: Vec<NodeTemplate>) -> Self {
        Self {
            workflow_type: workflow_type.to_string(),
            intents: BTreeMap::new(),
            default_nodes,
        }
    }

    #[must_use]
    pub fn intent(mut self, intent_class: &str, nodes: Vec<NodeTemplate>) -> Self {
        self.intents.insert(intent_class.to_string(), nodes);
        self
    }

    /// Templates for `intent_class`, falling back to the default set.
    pub fn templates_for(&self, intent_class: &str) -> &[NodeTemplate] {
        self.intents
            .get(intent_class)
            .map_or(self.default_nodes.as_slice(), Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    workflows: HashMap<Role, WorkflowDefinition>,
}

impl WorkflowCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_workflow(mut self, role: Role, workflow: WorkflowDefinition) -> Self {
        self.workflows.insert(role, workflow);
        self
    }

    pub fn get(&self, role: Role) -> Option<&WorkflowDefinition> {
        self.workflows.get(&role)
    }

    pub fn standard() -> Self {
        Self::empty()
            .with_workflow(Role::Admin, admin_diagnostics())
            .with_workflow(Role::Recruiter, recruiter_candidate_assessment())
            .with_workflow(Role::Carrier, carrier_operational_benchmark())
            .with_workflow(Role::Driver, driver_carrier_intelligence())
    }
}

fn admin_diagnostics() -> WorkflowDefinition {
    WorkflowDefinition::new(
        "admin_diagnostics",
        vec![
            NodeTemplate::new("n1", "observability_ops", "get_tracing_dashboard")
                .params(json!({"window": "24h"})),
            NodeTemplate::new("n2", "external_api", "get_api_health"),
            NodeTemplate::new("n3", "observability_ops", "get_tool_performance")
                .params(json!({"window": "24h"})),
            NodeTemplate::new("n4", "external_api", "get_api_usage")
                .params(json!({"window": "24h"}))
                .after(&["n2"]),
            NodeTemplate::new("n5", "observability_ops", "get_agent_replay")
                .params(json!({"limit": 5, "status": "failed"}))
                .after(&["n1", "n3"])
                .join("diagnostics_synthesis")
                .context_only(),
        ],
    )
    .intent(
        "ai_performance",
        vec![
            NodeTemplate::new("n1", "observability_ops", "get_scoring_accuracy"),
            NodeTemplate::new("n2", "observability_ops", "get_tool_performance")
                .params(json!({"window": "7d"})),
            NodeTemplate::new("n3", "observability_ops", "recalibrate_scoring")
                .params(json!({"scope": "all_roles"}))
                .after(&["n1", "n2"])
                .join("scoring_review"),
        ],
    )
    .intent(
        "data_analysis",
        vec![
            NodeTemplate::new("n1", "cross_role_utility", "get_platform_benchmarks"),
            NodeTemplate::new("n2", "cross_role_utility", "get_industry_trends"),
            NodeTemplate::new("n3", "cross_role_utility", "get_regional_analysis"),
        ],
    )
}

fn recruiter_candidate_assessment() -> WorkflowDefinition {
    WorkflowDefinition::new(
        "recruiter_candidate_assessment",
        vec![
            NodeTemplate::new("n1", "cross_role_utility", "get_driver_market_value"),
            NodeTemplate::new("n2", "cross_role_utility", "get_regional_analysis"),
            NodeTemplate::new("n3", "recruiter_analytics", "get_funnel_analysis"),
            NodeTemplate::new("n4", "recruiter_analytics", "get_source_roi").after(&["n3"]),
        ],
    )
    .intent(
        "pipeline_analysis",
        vec![
            NodeTemplate::new("n1", "recruiter_pipeline", "get_stale_candidates")
                .params(json!({"days": 14})),
            NodeTemplate::new("n2", "recruiter_analytics", "get_drop_off_analysis"),
            NodeTemplate::new("n3", "recruiter_analytics", "get_funnel_analysis"),
        ],
    )
    .intent(
        "campaign_management",
        vec![
            NodeTemplate::new("n1", "recruiter_paid_media", "get_campaign_performance"),
            NodeTemplate::new("n2", "recruiter_analytics", "get_source_roi"),
            NodeTemplate::new("n3", "recruiter_paid_media", "create_campaign_draft")
                .params(json!({"objective": "driver_applications"}))
                .after(&["n1", "n2"])
                .join("campaign_launch"),
            NodeTemplate::new("n4", "recruiter_paid_media", "create_campaign")
                .params(json!({"objective": "driver_applications", "daily_budget": 50}))
                .after(&["n3"])
                .join("campaign_launch"),
        ],
    )
}

fn carrier_operational_benchmark() -> WorkflowDefinition {
    WorkflowDefinition::new(
        "carrier_operational_benchmark",
        vec![
            NodeTemplate::new("n1", "cross_role_utility", "get_platform_benchmarks"),
            NodeTemplate::new("n2", "cross_role_utility", "get_industry_trends"),
            NodeTemplate::new("n3", "carrier_fleet", "get_fleet_summary"),
            NodeTemplate::new("n4", "cross_role_utility", "compare_carriers")
                .after(&["n1", "n3"])
                .join("benchmark_synthesis"),
        ],
    )
    .intent(
        "compliance_ops",
        vec![
            NodeTemplate::new("n1", "carrier_fleet", "get_compliance_snapshot"),
            NodeTemplate::new("n2", "cross_role_utility", "get_platform_benchmarks")
                .params(json!({"metric": "safety"})),
        ],
    )
}

fn driver_carrier_intelligence() -> WorkflowDefinition {
    WorkflowDefinition::new(
        "driver_carrier_intelligence",
        vec![
            NodeTemplate::new("n1", "cross_role_utility", "compare_carriers"),
            NodeTemplate::new("n2", "cross_role_utility", "get_driver_market_value"),
            NodeTemplate::new("n3", "driver_cockpit", "get_carrier_reviews"),
            NodeTemplate::new("n4", "driver_cockpit", "find_matches")
                .after(&["n1", "n2"])
                .join("match_synthesis"),
        ],
    )
    .intent(
        "compensation_discovery",
        vec![
            NodeTemplate::new("n1", "cross_role_utility", "get_driver_market_value"),
            NodeTemplate::new("n2", "cross_role_utility", "get_regional_analysis"),
            NodeTemplate::new("n3", "cross_role_utility", "get_industry_trends"),
        ],
    )
}
