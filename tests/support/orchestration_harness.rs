#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agentgate::agent::{TurnHandler, demo_registry};
use agentgate::config::ExecutorConfig;
use agentgate::executor::{DagExecutor, ExecutionFuture, PlanExecutionReport, PlanExecutor};
use agentgate::ledger::{
    Gate, GateFilter, GateResolution, InMemoryLedger, LedgerFuture, NewGate, NewStep,
    PlanningMetadata, Run, RunLedger, RunMetadata, RunStatus, Step,
};
use agentgate::observability::NoopObserver;
use agentgate::planner::{
    ExecutionPlan, ExecutionPlanner, KeywordIntentClassifier, PlanBuilder, PlanFuture,
    PlanningContext, WorkflowCatalog,
};
use agentgate::rollout::Role;
use agentgate::tools::{ActionRegistry, ToolContext};
use agentgate::verifier::{ConsistencyVerifier, ResponseVerifier, VerifyFuture};

#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: String,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub retry_count: u32,
    pub metadata: RunMetadata,
}

/// Ledger that records every `complete_run` call before delegating.
#[derive(Default)]
pub struct SpyLedger {
    inner: InMemoryLedger,
    completions: Mutex<Vec<CompletedRun>>,
}

impl SpyLedger {
    pub fn completions(&self) -> Vec<CompletedRun> {
        self.completions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn completions_for(&self, run_id: &str) -> Vec<CompletedRun> {
        self.completions()
            .into_iter()
            .filter(|completed| completed.run_id == run_id)
            .collect()
    }
}

impl RunLedger for SpyLedger {
    fn start_run<'a>(
        &'a self,
        role: Role,
        user_id: &'a str,
        goal_text: &'a str,
    ) -> LedgerFuture<'a, String> {
        self.inner.start_run(role, user_id, goal_text)
    }

    fn update_run_planning_metadata<'a>(
        &'a self,
        run_id: &'a str,
        planning: PlanningMetadata,
    ) -> LedgerFuture<'a, ()> {
        self.inner.update_run_planning_metadata(run_id, planning)
    }

    fn log_step<'a>(&'a self, run_id: &'a str, step: NewStep) -> LedgerFuture<'a, String> {
        self.inner.log_step(run_id, step)
    }

    fn create_gate<'a>(&'a self, gate: NewGate) -> LedgerFuture<'a, Gate> {
        self.inner.create_gate(gate)
    }

    fn resolve_gate<'a>(
        &'a self,
        gate_id: &'a str,
        resolution: GateResolution,
    ) -> LedgerFuture<'a, Gate> {
        self.inner.resolve_gate(gate_id, resolution)
    }

    fn consume_gate<'a>(&'a self, gate_id: &'a str) -> LedgerFuture<'a, Gate> {
        self.inner.consume_gate(gate_id)
    }

    fn get_gate<'a>(&'a self, gate_id: &'a str) -> LedgerFuture<'a, Option<Gate>> {
        self.inner.get_gate(gate_id)
    }

    fn list_gates<'a>(&'a self, filter: GateFilter) -> LedgerFuture<'a, Vec<Gate>> {
        self.inner.list_gates(filter)
    }

    fn complete_run<'a>(
        &'a self,
        run_id: &'a str,
        status: RunStatus,
        duration_ms: u64,
        retry_count: u32,
        metadata: RunMetadata,
    ) -> LedgerFuture<'a, ()> {
        self.completions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(CompletedRun {
                run_id: run_id.to_string(),
                status,
                duration_ms,
                retry_count,
                metadata: metadata.clone(),
            });
        self.inner
            .complete_run(run_id, status, duration_ms, retry_count, metadata)
    }

    fn get_run<'a>(&'a self, run_id: &'a str) -> LedgerFuture<'a, Option<Run>> {
        self.inner.get_run(run_id)
    }

    fn list_steps<'a>(&'a self, run_id: &'a str) -> LedgerFuture<'a, Vec<Step>> {
        self.inner.list_steps(run_id)
    }

    fn recent_runs<'a>(&'a self, limit: usize) -> LedgerFuture<'a, Vec<Run>> {
        self.inner.recent_runs(limit)
    }
}

pub struct CountingPlanner {
    inner: Arc<dyn ExecutionPlanner>,
    calls: AtomicUsize,
}

impl CountingPlanner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExecutionPlanner for CountingPlanner {
    fn build_execution_plan<'a>(
        &'a self,
        role: Role,
        task_text: &'a str,
        ctx: &'a PlanningContext,
    ) -> PlanFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.build_execution_plan(role, task_text, ctx)
    }
}

pub struct CountingExecutor {
    inner: DagExecutor,
    calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PlanExecutor for CountingExecutor {
    fn execute_planned_read_nodes<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        ctx: &'a ToolContext,
    ) -> ExecutionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_planned_read_nodes(plan, ctx)
    }
}

#[derive(Default)]
pub struct CountingVerifier {
    inner: ConsistencyVerifier,
    calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResponseVerifier for CountingVerifier {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn verify_planned_response<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        report: &'a PlanExecutionReport,
        draft: &'a str,
    ) -> VerifyFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify_planned_response(plan, report, draft)
    }
}

pub struct Harness {
    pub handler: TurnHandler,
    pub ledger: Arc<SpyLedger>,
    pub registry: Arc<ActionRegistry>,
    pub planner: Arc<CountingPlanner>,
    pub executor: Arc<CountingExecutor>,
    pub verifier: Arc<CountingVerifier>,
}

impl Harness {
    /// Demo routers and the standard workflow catalog.
    pub fn demo() -> Self {
        Self::custom(
            |ledger| demo_registry(ledger, Arc::new(NoopObserver)),
            WorkflowCatalog::standard(),
        )
    }

    /// Start from the demo registry and adjust it before the handler is built.
    pub fn with_registry(adjust: impl FnOnce(&mut ActionRegistry)) -> Self {
        Self::custom(
            |ledger| {
                let mut registry = demo_registry(ledger, Arc::new(NoopObserver));
                adjust(&mut registry);
                registry
            },
            WorkflowCatalog::standard(),
        )
    }

    pub fn custom(
        registry: impl FnOnce(Arc<dyn RunLedger>) -> ActionRegistry,
        catalog: WorkflowCatalog,
    ) -> Self {
        let ledger = Arc::new(SpyLedger::default());
        let shared: Arc<dyn RunLedger> = ledger.clone();
        let registry = Arc::new(registry(shared));
        let config = ExecutorConfig::default();

        let planner = Arc::new(CountingPlanner {
            inner: Arc::new(PlanBuilder::new(
                catalog,
                Arc::new(KeywordIntentClassifier::standard()),
                Arc::clone(&registry),
            )),
            calls: AtomicUsize::new(0),
        });
        let executor = Arc::new(CountingExecutor {
            inner: DagExecutor::new(Arc::clone(&registry), Arc::new(NoopObserver), &config),
            calls: AtomicUsize::new(0),
        });
        let verifier = Arc::new(CountingVerifier::default());

        let handler =
            TurnHandler::standard(Arc::clone(&registry), Arc::new(NoopObserver), &config)
                .with_planner(planner.clone())
                .with_executor(executor.clone())
                .with_verifier(verifier.clone());

        Self {
            handler,
            ledger,
            registry,
            planner,
            executor,
            verifier,
        }
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.planner.calls(),
            self.executor.calls(),
            self.verifier.calls(),
            self.ledger.completions().len(),
        )
    }
}
