use std::sync::Arc;

use agentgate::agent::{ExecutionPath, TurnContext, demo_registry};
use agentgate::config::RolloutConfig;
use agentgate::ledger::{RunLedger, RunStatus};
use agentgate::observability::NoopObserver;
use agentgate::planner::WorkflowCatalog;
use agentgate::rollout::Role;

use super::orchestration_harness::Harness;

#[tokio::test]
async fn default_rollout_keeps_every_role_on_the_legacy_path() {
    let h = Harness::demo();
    let turn = TurnContext::default();

    for role in [Role::Admin, Role::Recruiter, Role::Carrier, Role::Driver] {
        let outcome = h
            .handler
            .handle_agent_turn(role, "u1", "show me the numbers", &turn)
            .await
            .unwrap();
        assert_eq!(outcome.path, ExecutionPath::Legacy);
        assert!(outcome.plan.is_none());
        assert!(outcome.verification.is_none());
        assert!(!outcome.tool_calls.is_empty());
    }

    assert_eq!(h.counts(), (0, 0, 0, 4));
    for completed in h.ledger.completions() {
        assert_eq!(completed.status, RunStatus::Completed);
        assert_eq!(completed.metadata.execution_path.as_deref(), Some("legacy"));
        assert!(completed.metadata.verifier_status.is_none());
    }
}

#[tokio::test]
async fn enabled_roles_plan_execute_and_verify_exactly_once_per_turn() {
    let h = Harness::demo();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin, Role::Recruiter]));

    let admin = h
        .handler
        .handle_agent_turn(Role::Admin, "u1", "Investigate system health and api status", &turn)
        .await
        .unwrap();
    assert_eq!(h.counts(), (1, 1, 1, 1));

    let recruiter = h
        .handler
        .handle_agent_turn(Role::Recruiter, "u2", "assess this candidate", &turn)
        .await
        .unwrap();
    assert_eq!(h.counts(), (2, 2, 2, 2));

    for outcome in [&admin, &recruiter] {
        assert_eq!(outcome.path, ExecutionPath::PlannedParallel);
        let completed = h.ledger.completions_for(&outcome.run_id);
        assert_eq!(completed.len(), 1);
        assert!(completed[0].metadata.verifier_status.is_some());
        assert_eq!(
            completed[0].metadata.verifier_type.as_deref(),
            Some("consistency_verifier")
        );
    }
}

#[tokio::test]
async fn rollout_is_additive_per_role() {
    let h = Harness::demo();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));

    let driver = h
        .handler
        .handle_agent_turn(Role::Driver, "u3", "find me a carrier", &turn)
        .await
        .unwrap();

    assert_eq!(driver.path, ExecutionPath::Legacy);
    assert_eq!(h.counts(), (0, 0, 0, 1));
}

#[tokio::test]
async fn planning_without_parallel_reads_runs_the_plan_sequentially() {
    let h = Harness::demo();
    let rollout = RolloutConfig {
        dag_planning_enabled: true,
        dag_planning_enabled_roles: vec![Role::Carrier],
        ..RolloutConfig::default()
    };

    let outcome = h
        .handler
        .handle_agent_turn(Role::Carrier, "u4", "benchmark my fleet", &TurnContext::new(rollout))
        .await
        .unwrap();

    assert_eq!(outcome.path, ExecutionPath::PlannedSequential);
    assert!(outcome.verification.is_none());
    let report = outcome.report.unwrap();
    assert_eq!(report.executed_nodes, vec!["n1", "n2", "n3", "n4"]);
    assert_eq!(h.counts(), (1, 0, 0, 1));

    let run = h.ledger.get_run(&outcome.run_id).await.unwrap().unwrap();
    let planning = run.planning.unwrap();
    assert_eq!(planning.execution_model, "planned_sequential");
    assert_eq!(planning.workflow_type, "carrier_operational_benchmark");
}

#[tokio::test]
async fn planning_error_falls_back_to_the_legacy_path() {
    let h = Harness::custom(
        |ledger| demo_registry(ledger, Arc::new(NoopObserver)),
        WorkflowCatalog::empty(),
    );
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));

    let outcome = h
        .handler
        .handle_agent_turn(Role::Admin, "u1", "Investigate system health", &turn)
        .await
        .unwrap();

    assert_eq!(outcome.path, ExecutionPath::Legacy);
    assert!(
        outcome
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("no workflow mapping for role admin")
    );
    assert_eq!(h.counts(), (1, 0, 0, 1));

    let completed = h.ledger.completions_for(&outcome.run_id);
    assert_eq!(completed[0].status, RunStatus::Completed);
    assert_eq!(completed[0].metadata.execution_path.as_deref(), Some("legacy"));
    assert!(completed[0].metadata.fallback_reason.is_some());
}
