//! Demo router catalog with canned handlers, used by the CLI and the
//! end-to-end tests. Real deployments register their own handlers.

use crate::approval::ApprovalCoordinator;
use crate::ledger::RunLedger;
use crate::observability::Observer;
use crate::rollout::Role;
use crate::tools::{
    ActionHandler, ActionRegistry, FnHandler, RouterDefinition, StaticHandler, Tier,
    default_middleware_stack,
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Recruiter, Role::Carrier, Role::Driver];

/// Handler that echoes its params back under `record` with a fresh id.
fn mutation(prefix: &'static str, status: &'static str) -> impl ActionHandler {
    FnHandler::new(move |user_id: String, params: Value| async move {
        Ok::<Value, anyhow::Error>(json!({
            "id": format!("{prefix}_{}", Uuid::new_v4().simple()),
            "status": status,
            "requested_by": user_id,
            "record": params,
        }))
    })
}

fn canned(value: Value) -> StaticHandler {
    StaticHandler(value)
}

fn observability_ops() -> RouterDefinition {
    RouterDefinition::new("observability_ops", &[Role::Admin])
        .action(
            "get_tracing_dashboard",
            Tier::Read,
            canned(json!({
                "window": "24h",
                "requests": 18240,
                "p95_latency_ms": 412,
                "error_rate": 0.012
            })),
        )
        .action(
            "get_tool_performance",
            Tier::Read,
            canned(json!({
                "slowest_tool": "recruiter_analytics.get_funnel_analysis",
                "avg_latency_ms": 230,
                "failure_rate": 0.004
            })),
        )
        .action(
            "get_scoring_accuracy",
            Tier::Read,
            canned(json!({"precision": 0.87, "recall": 0.81, "sample_size": 640})),
        )
        .action(
            "get_agent_replay",
            Tier::Read,
            canned(json!({"failed_runs": [], "inspected": 25})),
        )
        .action("recalibrate_scoring", Tier::ExecuteHigh, mutation("recal", "scheduled"))
}

fn external_api() -> RouterDefinition {
    RouterDefinition::new("external_api", &[Role::Admin])
        .action(
            "get_api_health",
            Tier::Read,
            canned(json!({
                "status": "healthy",
                "degraded_endpoints": [],
                "uptime_pct": 99.95
            })),
        )
        .action(
            "get_api_usage",
            Tier::Read,
            canned(json!({"window": "24h", "calls": 52310, "quota_used_pct": 41})),
        )
        .action("test_api_endpoint", Tier::ExecuteLow, mutation("check", "passed"))
        .action("configure_api_key", Tier::ExecuteHigh, mutation("key", "rotated"))
}

fn cross_role_utility() -> RouterDefinition {
    RouterDefinition::new("cross_role_utility", ALL_ROLES)
        .action(
            "get_driver_market_value",
            Tier::Read,
            canned(json!({"median_cpm": 0.62, "p75_cpm": 0.71, "region": "midwest"})),
        )
        .action(
            "get_platform_benchmarks",
            Tier::Read,
            canned(json!({"avg_time_to_hire_days": 11, "offer_accept_rate": 0.58})),
        )
        .action(
            "get_regional_analysis",
            Tier::Read,
            canned(json!({"hottest_region": "southeast", "open_loads": 1840})),
        )
        .action(
            "compare_carriers",
            Tier::Read,
            canned(json!({"carriers_compared": 12, "top_carrier": "Northline Freight"})),
        )
        .action(
            "get_industry_trends",
            Tier::Read,
            canned(json!({
                "driver_supply_trend": "tightening",
                "yoy_pay_change_pct": 3.4
            })),
        )
}

fn recruiter_analytics() -> RouterDefinition {
    RouterDefinition::new("recruiter_analytics", &[Role::Recruiter, Role::Admin])
        .action(
            "get_funnel_analysis",
            Tier::Read,
            canned(json!({"applied": 420, "screened": 190, "hired": 37})),
        )
        .action(
            "get_source_roi",
            Tier::Read,
            canned(json!({"best_source": "job_boards", "cost_per_hire": 1150})),
        )
        .action(
            "get_drop_off_analysis",
            Tier::Read,
            canned(json!({"largest_drop": "background_check", "drop_rate": 0.31})),
        )
}

fn recruiter_pipeline() -> RouterDefinition {
    RouterDefinition::new("recruiter_pipeline", &[Role::Recruiter])
        .action(
            "get_stale_candidates",
            Tier::Read,
            canned(json!({"stale": 23, "oldest_days": 41})),
        )
        .action("bulk_update_stage", Tier::ExecuteHigh, mutation("stage", "updated"))
}

fn recruiter_paid_media() -> RouterDefinition {
    RouterDefinition::new("recruiter_paid_media", &[Role::Recruiter])
        .action(
            "get_campaign_performance",
            Tier::Read,
            canned(json!({"active_campaigns": 4, "cost_per_application": 18.5})),
        )
        .action("create_campaign_draft", Tier::ExecuteLow, mutation("draft", "draft"))
        .action("create_campaign", Tier::ExecuteHigh, mutation("cmp", "active"))
        .action("update_ad_set_budget", Tier::ExecuteHigh, mutation("budget", "updated"))
}

fn carrier_fleet() -> RouterDefinition {
    RouterDefinition::new("carrier_fleet", &[Role::Carrier])
        .action(
            "get_fleet_summary",
            Tier::Read,
            canned(json!({"trucks": 64, "active_drivers": 58, "utilization": 0.91})),
        )
        .action(
            "get_compliance_snapshot",
            Tier::Read,
            canned(json!({"expiring_medical_cards": 3, "open_violations": 0})),
        )
        .action("update_company_profile", Tier::ExecuteLow, mutation("profile", "saved"))
}

fn driver_cockpit() -> RouterDefinition {
    RouterDefinition::new("driver_cockpit", &[Role::Driver])
        .action(
            "find_matches",
            Tier::Read,
            canned(json!({"matches": 7, "best_match": "Northline Freight"})),
        )
        .action(
            "get_carrier_reviews",
            Tier::Read,
            canned(json!({
                "carrier": "Northline Freight",
                "avg_rating": 4.3,
                "reviews": 86
            })),
        )
        .action("save_carrier", Tier::ExecuteLow, mutation("saved", "saved"))
}

/// Every demo router behind the default middleware stack.
pub fn demo_registry(ledger: Arc<dyn RunLedger>, observer: Arc<dyn Observer>) -> ActionRegistry {
    let approvals = Arc::new(ApprovalCoordinator::new(Arc::clone(&ledger), observer));
    let mut registry = ActionRegistry::new(ledger, approvals, default_middleware_stack());
    for router in [
        observability_ops(),
        external_api(),
        cross_role_utility(),
        recruiter_analytics(),
        recruiter_pipeline(),
        recruiter_paid_media(),
        carrier_fleet(),
        driver_cockpit(),
    ] {
        registry.register(router);
    }
    registry
}
