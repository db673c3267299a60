use agentgate::AgentGateError;
use agentgate::agent::TurnContext;
use agentgate::config::RolloutConfig;
use agentgate::error::ToolError;
use agentgate::ledger::{GateFilter, RunLedger};
use agentgate::planner::{ExecutionPlanner, PlanningContext};
use agentgate::rollout::Role;
use agentgate::tools::{ToolCall, ToolContext};
use serde_json::json;

use super::orchestration_harness::Harness;

#[tokio::test]
async fn driver_cannot_reach_recruiter_routers() {
    let h = Harness::demo();
    let run_id = h
        .ledger
        .start_run(Role::Driver, "drv-1", "launch a campaign")
        .await
        .unwrap();
    let ctx = ToolContext::new(&run_id, Role::Driver, "drv-1");

    let error = h
        .registry
        .execute_tool(
            ToolCall::new("recruiter_paid_media", "create_campaign", json!({"daily_budget": 50})),
            &ctx,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ToolError::ForbiddenRole { ref router, ref role }
            if router == "recruiter_paid_media" && role == "driver"
    ));
    assert!(error.is_terminal_denial());
    assert!(h.ledger.list_steps(&run_id).await.unwrap().is_empty());
    assert!(
        h.ledger
            .list_gates(GateFilter::default().for_run(run_id.clone()))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn driver_plans_only_use_driver_routers() {
    let h = Harness::demo();
    let tasks = [
        "find carriers hiring near me",
        "what is the average cpm pay",
        "tell me about this carrier's reviews",
        "hello",
    ];

    for task in tasks {
        let ctx = PlanningContext {
            parallel_reads: true,
            intent_hint: None,
        };
        let plan = h
            .planner
            .build_execution_plan(Role::Driver, task, &ctx)
            .await
            .unwrap();
        for node in plan.nodes() {
            assert!(
                h.registry.router_allows(&node.tool, Role::Driver),
                "{task}: node {} uses {}",
                node.node_id,
                node.tool
            );
            assert!(node.tier.is_read());
        }
    }
}

#[tokio::test]
async fn legacy_driver_turn_never_touches_other_roles_routers() {
    let h = Harness::demo();
    let outcome = h
        .handler
        .handle_agent_turn(Role::Driver, "drv-1", "find me a carrier", &TurnContext::default())
        .await
        .unwrap();

    for step in h.ledger.list_steps(&outcome.run_id).await.unwrap() {
        assert!(
            step.router == "cross_role_utility" || step.router == "driver_cockpit",
            "driver reached {}",
            step.router
        );
    }
}

#[tokio::test]
async fn gate_cannot_be_resumed_by_another_role() {
    let h = Harness::demo();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Recruiter]))
        .with_intent("campaign_management");
    let outcome = h
        .handler
        .handle_agent_turn(Role::Recruiter, "rec-1", "launch a campaign", &turn)
        .await
        .unwrap();
    let gate_id = outcome.pending_approvals[0].gate_id.clone();

    let error = h
        .handler
        .resume_tool_call(Role::Driver, "drv-1", &gate_id)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AgentGateError::Tool(ToolError::ForbiddenRole { .. })
    ));
    let gate = h.ledger.get_gate(&gate_id).await.unwrap().unwrap();
    assert!(gate.is_pending());
}
