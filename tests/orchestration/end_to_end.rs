use agentgate::agent::{ExecutionPath, TurnContext};
use agentgate::config::RolloutConfig;
use agentgate::ledger::{RunLedger, RunStatus, trace};
use agentgate::rollout::Role;

use super::orchestration_harness::Harness;

#[tokio::test]
async fn admin_health_investigation_runs_the_full_planned_path() {
    let h = Harness::demo();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));

    let outcome = h
        .handler
        .handle_agent_turn(Role::Admin, "adm-1", "Investigate system health and api status", &turn)
        .await
        .unwrap();

    assert_eq!(h.counts(), (1, 1, 1, 1));
    assert_eq!(outcome.path, ExecutionPath::PlannedParallel);
    assert!(outcome.pending_approvals.is_empty());
    assert!(outcome.fallback_reason.is_none());

    let plan = outcome.plan.as_ref().unwrap();
    assert_eq!(plan.workflow_type(), "admin_diagnostics");
    assert_eq!(plan.intent_class(), "system_health");

    let report = outcome.report.as_ref().unwrap();
    let mut executed = report.executed_nodes.clone();
    executed.sort();
    assert_eq!(executed, vec!["n1", "n2", "n3", "n4", "n5"]);
    assert!(report.failed_nodes.is_empty());
    assert!(report.deferred_nodes.is_empty());
    assert!(!report.is_partial());
    assert_eq!(report.join_results["diagnostics_synthesis"].len(), 1);

    assert!(outcome.response.starts_with("Findings for admin_diagnostics:"));
    assert!(outcome.response.contains("external_api.get_api_health: ok"));

    let completed = h.ledger.completions_for(&outcome.run_id);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, RunStatus::Completed);
    assert_eq!(completed[0].retry_count, 0);
    assert_eq!(
        completed[0].metadata.execution_path.as_deref(),
        Some("planned_parallel")
    );
    assert_eq!(completed[0].metadata.verifier_status.as_deref(), Some("verified"));
    assert_eq!(
        completed[0].metadata.verifier_type.as_deref(),
        Some("consistency_verifier")
    );
    assert!(completed[0].metadata.verifier_issues.is_empty());

    let run = h.ledger.get_run(&outcome.run_id).await.unwrap().unwrap();
    let planning = run.planning.unwrap();
    assert_eq!(planning.planned_nodes, 5);
    assert_eq!(planning.branch_count, 4);
    assert_eq!(planning.execution_model, "planned_parallel");
}

#[tokio::test]
async fn execution_trace_groups_steps_by_branch() {
    let h = Harness::demo();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));
    let outcome = h
        .handler
        .handle_agent_turn(Role::Admin, "adm-1", "Investigate system health and api status", &turn)
        .await
        .unwrap();

    let trace = trace::execution_trace(h.ledger.as_ref(), &outcome.run_id)
        .await
        .unwrap();

    assert_eq!(trace.run.status, RunStatus::Completed);
    assert_eq!(trace.execution.branch_count, 4);
    assert_eq!(trace.execution.step_count, 5);
    assert_eq!(trace.execution.gate_count, 0);
    let branches: Vec<&str> = trace.branches.iter().map(|b| b.branch_id.as_str()).collect();
    assert_eq!(branches, vec!["b1", "b2", "b3", "b4"]);
    assert_eq!(trace.branches[1].step_count, 2);
    assert_eq!(trace.verifier.unwrap().status, "verified");
    assert_eq!(trace.timeline.len(), 5);
}

#[tokio::test]
async fn recent_runs_list_newest_first() {
    let h = Harness::demo();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));
    let first = h
        .handler
        .handle_agent_turn(Role::Admin, "adm-1", "Investigate system health", &turn)
        .await
        .unwrap();
    let second = h
        .handler
        .handle_agent_turn(Role::Driver, "drv-1", "find me a carrier", &turn)
        .await
        .unwrap();

    let traces = trace::recent_runs_with_execution(h.ledger.as_ref(), 10)
        .await
        .unwrap();
    let ids: Vec<&str> = traces.iter().map(|t| t.run.run_id.as_str()).collect();
    assert_eq!(ids, vec![second.run_id.as_str(), first.run_id.as_str()]);
}
