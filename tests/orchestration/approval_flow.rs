use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use agentgate::AgentGateError;
use agentgate::agent::{ExecutionPath, TurnContext};
use agentgate::approval::ApprovalDecision;
use agentgate::config::RolloutConfig;
use agentgate::error::{ApprovalError, ToolError};
use agentgate::ledger::{GateStatus, RunLedger, StepStatus};
use agentgate::rollout::Role;
use agentgate::tools::{FnHandler, RouterDefinition, StaticHandler, Tier, ToolCall, ToolContext};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::orchestration_harness::Harness;

/// Demo harness whose `create_campaign` handler counts and records its calls.
fn counting_harness() -> (Harness, Arc<AtomicUsize>, Arc<Mutex<Vec<Value>>>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (handler_calls, handler_seen) = (Arc::clone(&calls), Arc::clone(&seen));

    let harness = Harness::with_registry(move |registry| {
        registry.register(
            RouterDefinition::new("recruiter_paid_media", &[Role::Recruiter])
                .action(
                    "get_campaign_performance",
                    Tier::Read,
                    StaticHandler(json!({"active_campaigns": 3, "cost_per_applicant": 41})),
                )
                .action(
                    "create_campaign_draft",
                    Tier::ExecuteLow,
                    StaticHandler(json!({"draft_id": "draft-a", "status": "draft"})),
                )
                .action(
                    "create_campaign",
                    Tier::ExecuteHigh,
                    FnHandler::new(move |_user_id: String, params: Value| {
                        let calls = Arc::clone(&handler_calls);
                        let seen = Arc::clone(&handler_seen);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            seen.lock().await.push(params);
                            Ok::<Value, anyhow::Error>(json!({"campaign_id": "cmp-a", "status": "active"}))
                        }
                    }),
                )
                .action(
                    "update_ad_set_budget",
                    Tier::ExecuteHigh,
                    StaticHandler(json!({"status": "updated"})),
                ),
        );
    });
    (harness, calls, seen)
}

fn campaign_turn() -> TurnContext {
    TurnContext::new(RolloutConfig::planned_for(&[Role::Recruiter])).with_intent("campaign_management")
}

async fn pending_campaign_gate(h: &Harness) -> (String, String) {
    let outcome = h
        .handler
        .handle_agent_turn(Role::Recruiter, "rec-1", "launch a campaign", &campaign_turn())
        .await
        .unwrap();

    assert_eq!(outcome.path, ExecutionPath::PlannedParallel);
    assert_eq!(outcome.pending_approvals.len(), 1);
    let pending = &outcome.pending_approvals[0];
    assert_eq!(pending.tool_name, "recruiter_paid_media.create_campaign");
    assert_eq!(pending.node_id.as_deref(), Some("n4"));
    (outcome.run_id, pending.gate_id.clone())
}

#[tokio::test]
async fn high_tier_node_opens_a_gate_without_running() {
    let (h, calls, _) = counting_harness();
    let (run_id, gate_id) = pending_campaign_gate(&h).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let gate = h.ledger.get_gate(&gate_id).await.unwrap().unwrap();
    assert_eq!(gate.status, GateStatus::Pending);
    assert_eq!(gate.run_id, run_id);

    let steps = h.ledger.list_steps(&run_id).await.unwrap();
    let gated = steps
        .iter()
        .find(|step| step.action == "create_campaign")
        .unwrap();
    assert_eq!(gated.status, StepStatus::ApprovalRequired);

    let completed = h.ledger.completions_for(&run_id);
    assert_eq!(completed[0].metadata.pending_gates, vec![gate_id]);
}

#[tokio::test]
async fn repeated_proposal_in_a_run_reuses_the_gate() {
    let (h, calls, _) = counting_harness();
    let run_id = h
        .ledger
        .start_run(Role::Recruiter, "rec-1", "launch")
        .await
        .unwrap();
    let ctx = ToolContext::new(&run_id, Role::Recruiter, "rec-1");
    let call = || {
        ToolCall::new(
            "recruiter_paid_media",
            "create_campaign",
            json!({"objective": "driver_applications", "daily_budget": 50}),
        )
    };

    let first = h.registry.execute_tool(call(), &ctx).await.unwrap();
    let second = h.registry.execute_tool(call(), &ctx).await.unwrap();

    assert!(first.gate_id().is_some());
    assert_eq!(first.gate_id(), second.gate_id());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn approved_gate_runs_the_action_exactly_once() {
    let (h, calls, seen) = counting_harness();
    let (_, gate_id) = pending_campaign_gate(&h).await;

    let gate = h
        .handler
        .resolve_gate(&gate_id, ApprovalDecision::Approved, "ops-lead", None)
        .await
        .unwrap();
    assert_eq!(gate.status, GateStatus::Approved);

    let resubmitted = h
        .handler
        .handle_agent_turn(
            Role::Recruiter,
            "rec-1",
            "launch a campaign",
            &campaign_turn().with_approved_gate(gate_id.clone()),
        )
        .await
        .unwrap();
    assert!(resubmitted.pending_approvals.is_empty());
    let report = resubmitted.report.unwrap();
    assert!(report.succeeded("n4"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        seen.lock().await.as_slice(),
        &[json!({"objective": "driver_applications", "daily_budget": 50})]
    );

    let consumed = h.ledger.get_gate(&gate_id).await.unwrap().unwrap();
    assert!(consumed.consumed_at.is_some());

    let replay = h
        .handler
        .resume_tool_call(Role::Recruiter, "rec-1", &gate_id)
        .await
        .unwrap_err();
    assert!(matches!(
        replay,
        AgentGateError::Tool(ToolError::GateConsumed { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_gate_never_runs_the_action() {
    let (h, calls, _) = counting_harness();
    let (_, gate_id) = pending_campaign_gate(&h).await;

    h.handler
        .resolve_gate(
            &gate_id,
            ApprovalDecision::Rejected,
            "ops-lead",
            Some("budget freeze".into()),
        )
        .await
        .unwrap();

    let error = h
        .handler
        .resume_tool_call(Role::Recruiter, "rec-1", &gate_id)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        AgentGateError::Tool(ToolError::ApprovalDenied { gate_id: ref denied, .. }) if *denied == gate_id
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let gate = h.ledger.get_gate(&gate_id).await.unwrap().unwrap();
    assert_eq!(gate.reason.as_deref(), Some("budget freeze"));
    assert!(gate.consumed_at.is_none());
}

#[tokio::test]
async fn gate_resolves_only_once() {
    let (h, _, _) = counting_harness();
    let (_, gate_id) = pending_campaign_gate(&h).await;

    h.handler
        .resolve_gate(&gate_id, ApprovalDecision::Approved, "ops-lead", None)
        .await
        .unwrap();
    let error = h
        .handler
        .resolve_gate(&gate_id, ApprovalDecision::Rejected, "ops-lead", None)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AgentGateError::Approval(ApprovalError::AlreadyResolved { ref status, .. }) if status == "approved"
    ));
}

#[tokio::test]
async fn unknown_approved_gate_fails_the_turn() {
    let (h, _, _) = counting_harness();
    let error = h
        .handler
        .handle_agent_turn(
            Role::Recruiter,
            "rec-1",
            "launch a campaign",
            &campaign_turn().with_approved_gate("gate-missing"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AgentGateError::Approval(ApprovalError::GateNotFound(_))
    ));
    let completed = h.ledger.completions();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, agentgate::ledger::RunStatus::Failed);
}
