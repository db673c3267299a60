use agentgate::agent::{ExecutionPath, TurnContext};
use agentgate::config::RolloutConfig;
use agentgate::ledger::{RunLedger, RunStatus, StepStatus};
use agentgate::rollout::Role;
use agentgate::tools::{FnHandler, RouterDefinition, StaticHandler, Tier};
use serde_json::{Value, json};

use super::orchestration_harness::Harness;

fn harness_with_failing_api_health() -> Harness {
    Harness::with_registry(|registry| {
        registry.register(
            RouterDefinition::new("external_api", &[Role::Admin])
                .action(
                    "get_api_health",
                    Tier::Read,
                    FnHandler::new(|_user_id: String, _params: Value| async {
                        Err::<Value, anyhow::Error>(anyhow::anyhow!("upstream health check unreachable"))
                    }),
                )
                .action(
                    "get_api_usage",
                    Tier::Read,
                    StaticHandler(json!({"requests": 48210, "quota_used_pct": 62})),
                ),
        );
    })
}

#[tokio::test]
async fn failed_branch_skips_its_dependents_and_keeps_the_rest() {
    let h = harness_with_failing_api_health();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));

    let outcome = h
        .handler
        .handle_agent_turn(Role::Admin, "adm-1", "Investigate system health and api status", &turn)
        .await
        .unwrap();

    assert_eq!(outcome.path, ExecutionPath::PlannedParallel);
    let report = outcome.report.as_ref().unwrap();
    assert_eq!(report.failed_nodes, vec!["n2"]);
    assert_eq!(report.skipped_nodes.len(), 1);
    assert_eq!(report.skipped_nodes[0].node_id, "n4");
    assert_eq!(report.skipped_nodes[0].reason, "dependency n2 failed");
    assert!(report.succeeded("n1"));
    assert!(report.succeeded("n3"));
    assert!(report.succeeded("n5"));
    assert!(report.is_partial());

    assert!(outcome.response.contains("partial results only"));
    let verification = outcome.verification.as_ref().unwrap();
    assert!(verification.is_verified(), "{:?}", verification.issue_lines());

    let steps = h.ledger.list_steps(&outcome.run_id).await.unwrap();
    let failed: Vec<&str> = steps
        .iter()
        .filter(|step| step.status == StepStatus::Failed)
        .map(|step| step.action.as_str())
        .collect();
    assert_eq!(failed, vec!["get_api_health"]);
    assert!(steps.iter().all(|step| step.action != "get_api_usage"));

    let completed = h.ledger.completions_for(&outcome.run_id);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn unhedged_draft_over_partial_data_is_flagged() {
    use agentgate::verifier::{ConsistencyVerifier, VerificationStatus};

    let h = harness_with_failing_api_health();
    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));
    let outcome = h
        .handler
        .handle_agent_turn(Role::Admin, "adm-1", "Investigate system health", &turn)
        .await
        .unwrap();

    let verdict = ConsistencyVerifier::new().check(
        outcome.plan.as_ref().unwrap(),
        outcome.report.as_ref().unwrap(),
        "Everything is healthy across every integration.",
    );
    assert_eq!(verdict.status, VerificationStatus::Flagged);
    assert!(
        verdict
            .issues
            .iter()
            .any(|issue| issue.code == "unhedged_partial_data")
    );
}
