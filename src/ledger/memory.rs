use super::journal::{JournalRecord, LedgerJournal};
use super::types::{
    Gate, GateFilter, GateResolution, GateStatus, NewGate, NewStep, PlanningMetadata, Run,
    RunMetadata, RunStatus, Step,
};
use super::{LedgerFuture, RunLedger};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::rollout::Role;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct LedgerState {
    runs: HashMap<String, Run>,
    run_order: Vec<String>,
    steps: HashMap<String, Vec<Step>>,
    gates: HashMap<String, Gate>,
    gate_order: Vec<String>,
}

impl LedgerState {
    fn running_run(&mut self, run_id: &str) -> Result<&mut Run, LedgerError> {
        let run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| LedgerError::RunNotFound(run_id.to_string()))?;
        if run.status != RunStatus::Running {
            return Err(LedgerError::RunAlreadyCompleted {
                run_id: run_id.to_string(),
                status: run.status.to_string(),
            });
        }
        Ok(run)
    }
}

/// Process-local ledger, optionally mirrored to a JSONL journal.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    journal: Option<LedgerJournal>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            journal: None,
        }
    }

    pub fn with_journal(journal: LedgerJournal) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            journal: Some(journal),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        match &config.journal_path {
            Some(path) => Self::with_journal(LedgerJournal::new(path.clone())),
            None => Self::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn record(&self, record: JournalRecord) {
        if let Some(journal) = &self.journal
            && let Err(error) = journal.append(&record).await
        {
            tracing::warn!(path = %journal.path().display(), error = %error, "ledger journal append failed");
        }
    }

    fn update_gate(
        &self,
        gate_id: &str,
        apply: impl FnOnce(&mut Gate) -> Result<(), LedgerError>,
    ) -> Result<Gate, LedgerError> {
        let mut state = self.lock();
        let gate = state
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| LedgerError::GateNotFound(gate_id.to_string()))?;
        apply(gate)?;
        Ok(gate.clone())
    }
}

impl RunLedger for InMemoryLedger {
    fn start_run<'a>(
        &'a self,
        role: Role,
        user_id: &'a str,
        goal_text: &'a str,
    ) -> LedgerFuture<'a, String> {
        Box::pin(async move {
            let run = Run {
                run_id: format!("run_{}", Uuid::new_v4().simple()),
                role,
                user_id: user_id.to_string(),
                goal_text: goal_text.to_string(),
                status: RunStatus::Running,
                started_at: Utc::now().to_rfc3339(),
                completed_at: None,
                duration_ms: None,
                retry_count: 0,
                planning: None,
                metadata: RunMetadata::default(),
            };
            let run_id = run.run_id.clone();
            {
                let mut state = self.lock();
                state.run_order.push(run_id.clone());
                state.steps.insert(run_id.clone(), Vec::new());
                state.runs.insert(run_id.clone(), run.clone());
            }
            self.record(JournalRecord::RunStarted { run }).await;
            Ok(run_id)
        })
    }

    fn update_run_planning_metadata<'a>(
        &'a self,
        run_id: &'a str,
        planning: PlanningMetadata,
    ) -> LedgerFuture<'a, ()> {
        Box::pin(async move {
            self.lock().running_run(run_id)?.planning = Some(planning.clone());
            self.record(JournalRecord::RunPlanned {
                run_id: run_id.to_string(),
                planning,
            })
            .await;
            Ok(())
        })
    }

    fn log_step<'a>(&'a self, run_id: &'a str, step: NewStep) -> LedgerFuture<'a, String> {
        Box::pin(async move {
            let step = Step {
                step_id: format!("step_{}", Uuid::new_v4().simple()),
                run_id: run_id.to_string(),
                router: step.router,
                action: step.action,
                tier: step.tier,
                params: step.params,
                result: step.result,
                status: step.status,
                latency_ms: step.latency_ms,
                error: step.error,
                node_id: step.node_id,
                branch_id: step.branch_id,
                join_key: step.join_key,
                execution_mode: step.execution_mode,
                recorded_at: Utc::now().to_rfc3339(),
            };
            let step_id = step.step_id.clone();
            {
                let mut state = self.lock();
                state.running_run(run_id)?;
                state
                    .steps
                    .entry(run_id.to_string())
                    .or_default()
                    .push(step.clone());
            }
            self.record(JournalRecord::StepLogged { step }).await;
            Ok(step_id)
        })
    }

    fn create_gate<'a>(&'a self, gate: NewGate) -> LedgerFuture<'a, Gate> {
        Box::pin(async move {
            let gate = Gate {
                gate_id: format!("gate_{}", Uuid::new_v4().simple()),
                run_id: gate.run_id,
                role: gate.role,
                user_id: gate.user_id,
                tool_name: gate.tool_name,
                params: gate.params,
                params_fingerprint: gate.params_fingerprint,
                status: GateStatus::Pending,
                created_at: Utc::now().to_rfc3339(),
                resolved_at: None,
                decided_by: None,
                reason: None,
                consumed_at: None,
                node_id: gate.node_id,
                branch_id: gate.branch_id,
                execution_mode: gate.execution_mode,
            };
            {
                let mut state = self.lock();
                state.running_run(&gate.run_id)?;
                state.gate_order.push(gate.gate_id.clone());
                state.gates.insert(gate.gate_id.clone(), gate.clone());
            }
            self.record(JournalRecord::GateCreated { gate: gate.clone() })
                .await;
            Ok(gate)
        })
    }

    fn resolve_gate<'a>(
        &'a self,
        gate_id: &'a str,
        resolution: GateResolution,
    ) -> LedgerFuture<'a, Gate> {
        Box::pin(async move {
            let gate = self.update_gate(gate_id, |gate| {
                if gate.status != GateStatus::Pending {
                    return Err(LedgerError::GateAlreadyResolved {
                        gate_id: gate_id.to_string(),
                        status: gate.status.to_string(),
                    });
                }
                gate.status = resolution.status;
                gate.decided_by = Some(resolution.decided_by);
                gate.reason = resolution.reason;
                gate.resolved_at = Some(Utc::now().to_rfc3339());
                Ok(())
            })?;
            self.record(JournalRecord::GateResolved { gate: gate.clone() })
                .await;
            Ok(gate)
        })
    }

    fn consume_gate<'a>(&'a self, gate_id: &'a str) -> LedgerFuture<'a, Gate> {
        Box::pin(async move {
            let gate = self.update_gate(gate_id, |gate| {
                if gate.status != GateStatus::Approved {
                    return Err(LedgerError::GateNotApproved(gate_id.to_string()));
                }
                if gate.consumed_at.is_some() {
                    return Err(LedgerError::GateAlreadyConsumed(gate_id.to_string()));
                }
                gate.consumed_at = Some(Utc::now().to_rfc3339());
                Ok(())
            })?;
            self.record(JournalRecord::GateConsumed { gate: gate.clone() })
                .await;
            Ok(gate)
        })
    }

    fn get_gate<'a>(&'a self, gate_id: &'a str) -> LedgerFuture<'a, Option<Gate>> {
        Box::pin(async move { Ok(self.lock().gates.get(gate_id).cloned()) })
    }

    fn list_gates<'a>(&'a self, filter: GateFilter) -> LedgerFuture<'a, Vec<Gate>> {
        Box::pin(async move {
            let state = self.lock();
            Ok(state
                .gate_order
                .iter()
                .filter_map(|gate_id| state.gates.get(gate_id))
                .filter(|gate| filter.matches(gate))
                .cloned()
                .collect())
        })
    }

    fn complete_run<'a>(
        &'a self,
        run_id: &'a str,
        status: RunStatus,
        duration_ms: u64,
        retry_count: u32,
        metadata: RunMetadata,
    ) -> LedgerFuture<'a, ()> {
        Box::pin(async move {
            let run = {
                let mut state = self.lock();
                let run = state.running_run(run_id)?;
                run.status = status;
                run.duration_ms = Some(duration_ms);
                run.retry_count = retry_count;
                run.metadata = metadata;
                run.completed_at = Some(Utc::now().to_rfc3339());
                run.clone()
            };
            self.record(JournalRecord::RunCompleted { run }).await;
            Ok(())
        })
    }

    fn get_run<'a>(&'a self, run_id: &'a str) -> LedgerFuture<'a, Option<Run>> {
        Box::pin(async move { Ok(self.lock().runs.get(run_id).cloned()) })
    }

    fn list_steps<'a>(&'a self, run_id: &'a str) -> LedgerFuture<'a, Vec<Step>> {
        Box::pin(async move {
            let state = self.lock();
            if !state.runs.contains_key(run_id) {
                return Err(LedgerError::RunNotFound(run_id.to_string()));
            }
            Ok(state.steps.get(run_id).cloned().unwrap_or_default())
        })
    }

    fn recent_runs<'a>(&'a self, limit: usize) -> LedgerFuture<'a, Vec<Run>> {
        Box::pin(async move {
            let state = self.lock();
            Ok(state
                .run_order
                .iter()
                .rev()
                .take(limit)
                .filter_map(|run_id| state.runs.get(run_id).cloned())
                .collect())
        })
    }
}
