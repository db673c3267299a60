//! Run ledger: durable record of runs, steps and approval gates.
//!
//! Steps are append-only. Gates move `pending -> approved | rejected` exactly
//! once, and an approved gate can be consumed by exactly one execution. A run
//! is completed exactly once.

mod journal;
mod memory;
pub mod trace;
pub mod types;

pub use journal::{JournalRecord, LedgerJournal};
pub use memory::InMemoryLedger;
pub use trace::{BranchTrace, ExecutionTrace, GateAudit, GateAuditEntry, TimelineEntry};
pub use types::{
    Gate, GateFilter, GateResolution, GateStatus, NewGate, NewStep, PlanningMetadata, Run,
    RunMetadata, RunStatus, Step, StepStatus,
};

use crate::error::LedgerError;
use crate::rollout::Role;
use std::future::Future;
use std::pin::Pin;

pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Storage seam for run history. Implementations must be safe to call from
/// concurrently executing plan nodes.
pub trait RunLedger: Send + Sync {
    /// Open a run and return its id.
    fn start_run<'a>(
        &'a self,
        role: Role,
        user_id: &'a str,
        goal_text: &'a str,
    ) -> LedgerFuture<'a, String>;

    fn update_run_planning_metadata<'a>(
        &'a self,
        run_id: &'a str,
        planning: PlanningMetadata,
    ) -> LedgerFuture<'a, ()>;

    /// Append a step to a running run and return the step id.
    fn log_step<'a>(&'a self, run_id: &'a str, step: NewStep) -> LedgerFuture<'a, String>;

    fn create_gate<'a>(&'a self, gate: NewGate) -> LedgerFuture<'a, Gate>;

    /// Move a pending gate to its terminal status.
    fn resolve_gate<'a>(
        &'a self,
        gate_id: &'a str,
        resolution: GateResolution,
    ) -> LedgerFuture<'a, Gate>;

    /// Mark an approved gate as used. Fails if it was already consumed.
    fn consume_gate<'a>(&'a self, gate_id: &'a str) -> LedgerFuture<'a, Gate>;

    fn get_gate<'a>(&'a self, gate_id: &'a str) -> LedgerFuture<'a, Option<Gate>>;

    fn list_gates<'a>(&'a self, filter: GateFilter) -> LedgerFuture<'a, Vec<Gate>>;

    fn complete_run<'a>(
        &'a self,
        run_id: &'a str,
        status: RunStatus,
        duration_ms: u64,
        retry_count: u32,
        metadata: RunMetadata,
    ) -> LedgerFuture<'a, ()>;

    fn get_run<'a>(&'a self, run_id: &'a str) -> LedgerFuture<'a, Option<Run>>;

    /// Steps of one run in append order.
    fn list_steps<'a>(&'a self, run_id: &'a str) -> LedgerFuture<'a, Vec<Step>>;

    /// Most recently started runs, newest first.
    fn recent_runs<'a>(&'a self, limit: usize) -> LedgerFuture<'a, Vec<Run>>;
}
