use std::sync::Arc;

use agentgate::agent::{TurnContext, TurnHandler, demo_registry};
use agentgate::config::{ExecutorConfig, RolloutConfig};
use agentgate::ledger::{InMemoryLedger, LedgerJournal, RunLedger};
use agentgate::observability::NoopObserver;
use agentgate::rollout::Role;
use serde_json::Value;

#[tokio::test]
async fn turn_is_mirrored_to_the_journal_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runs").join("ledger.jsonl");
    let ledger: Arc<dyn RunLedger> =
        Arc::new(InMemoryLedger::with_journal(LedgerJournal::new(&path)));
    let registry = Arc::new(demo_registry(Arc::clone(&ledger), Arc::new(NoopObserver)));
    let handler = TurnHandler::standard(registry, Arc::new(NoopObserver), &ExecutorConfig::default());

    let turn = TurnContext::new(RolloutConfig::planned_for(&[Role::Admin]));
    let outcome = handler
        .handle_agent_turn(Role::Admin, "adm-1", "Investigate system health and api status", &turn)
        .await
        .unwrap();

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let records: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let events: Vec<&str> = records
        .iter()
        .map(|record| record["event"].as_str().unwrap())
        .collect();

    assert_eq!(events.first(), Some(&"run_started"));
    assert_eq!(events.get(1), Some(&"run_planned"));
    assert_eq!(events.last(), Some(&"run_completed"));
    assert_eq!(events.iter().filter(|e| **e == "step_logged").count(), 5);
    assert!(records.iter().all(|record| record["recorded_at"].is_string()));

    let last = records.last().unwrap();
    assert_eq!(last["run"]["run_id"], outcome.run_id.as_str());
    assert_eq!(last["run"]["status"], "completed");
    assert_eq!(last["run"]["metadata"]["execution_path"], "planned_parallel");
}
