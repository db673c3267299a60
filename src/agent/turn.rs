use super::legacy::{
    CatalogToolProposer, ToolCallProposer, ToolCallRecord, render_legacy_response,
    run_sequential_calls,
};
use super::synthesis::{DigestSynthesizer, ResponseSynthesizer};
use crate::approval::ApprovalDecision;
use crate::config::{ExecutorConfig, RolloutConfig};
use crate::error::{AgentGateError, ApprovalError, ToolError};
use crate::executor::{DagExecutor, PlanExecutionReport, PlanExecutor, SequentialDispatcher};
use crate::ledger::{Gate, RunLedger, RunMetadata, RunStatus};
use crate::observability::{Observer, ObserverEvent};
use crate::planner::{
    ExecutionPlan, ExecutionPlanner, IntentClassifier, KeywordIntentClassifier, PlanBuilder,
    PlanningContext, WorkflowCatalog,
};
use crate::rollout::{FeatureGate, Role, RolloutDecision};
use crate::tools::{ActionRegistry, ToolCall, ToolContext, ToolOutcome};
use crate::verifier::{ConsistencyVerifier, ResponseVerifier, VerificationReport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionPath {
    /// Direct router calls, no plan.
    Legacy,
    PlannedParallel,
    PlannedSequential,
}

/// Per-turn inputs supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub rollout: RolloutConfig,
    /// Resubmission of a turn whose `execute_high` call was approved.
    pub approved_gate_id: Option<String>,
    /// Skip intent classification.
    pub intent_hint: Option<String>,
}

impl TurnContext {
    pub fn new(rollout: RolloutConfig) -> Self {
        Self {
            rollout,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_approved_gate(mut self, gate_id: impl Into<String>) -> Self {
        self.approved_gate_id = Some(gate_id.into());
        self
    }

    #[must_use]
    pub fn with_intent(mut self, intent_class: impl Into<String>) -> Self {
        self.intent_hint = Some(intent_class.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub gate_id: String,
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub run_id: String,
    pub path: ExecutionPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ExecutionPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PlanExecutionReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationReport>,
    pub pending_approvals: Vec<PendingApproval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl TurnOutcome {
    fn metadata(&self) -> RunMetadata {
        RunMetadata {
            execution_path: Some(self.path.to_string()),
            verifier_status: self.verification.as_ref().map(|v| v.status.to_string()),
            verifier_type: self.verification.as_ref().map(|v| v.verifier_type.clone()),
            verifier_issues: self
                .verification
                .as_ref()
                .map(VerificationReport::issue_lines)
                .unwrap_or_default(),
            pending_gates: self
                .pending_approvals
                .iter()
                .map(|pending| pending.gate_id.clone())
                .collect(),
            fallback_reason: self.fallback_reason.clone(),
            error: None,
        }
    }
}

/// Composition root for one user turn.
///
/// Every turn opens exactly one run and completes it exactly once, on the
/// success and the failure path alike.
pub struct TurnHandler {
    registry: Arc<ActionRegistry>,
    ledger: Arc<dyn RunLedger>,
    observer: Arc<dyn Observer>,
    planner: Arc<dyn ExecutionPlanner>,
    executor: Arc<dyn PlanExecutor>,
    sequential: SequentialDispatcher,
    verifier: Arc<dyn ResponseVerifier>,
    synthesizer: Arc<dyn ResponseSynthesizer>,
    proposer: Arc<dyn ToolCallProposer>,
    digest_chars: usize,
}

impl TurnHandler {
    /// Keyword classification, the standard workflow catalog, the DAG
    /// executor and the consistency verifier.
    pub fn standard(
        registry: Arc<ActionRegistry>,
        observer: Arc<dyn Observer>,
        config: &ExecutorConfig,
    ) -> Self {
        let classifier: Arc<dyn IntentClassifier> = Arc::new(KeywordIntentClassifier::standard());
        let planner = PlanBuilder::new(
            WorkflowCatalog::standard(),
            Arc::clone(&classifier),
            Arc::clone(&registry),
        );
        let proposer = CatalogToolProposer::new(
            WorkflowCatalog::standard(),
            classifier,
            Arc::clone(&registry),
        );
        Self {
            ledger: Arc::clone(registry.ledger()),
            executor: Arc::new(DagExecutor::new(
                Arc::clone(&registry),
                Arc::clone(&observer),
                config,
            )),
            sequential: SequentialDispatcher::new(
                Arc::clone(&registry),
                Arc::clone(&observer),
                config,
            ),
            planner: Arc::new(planner),
            verifier: Arc::new(ConsistencyVerifier::new()),
            synthesizer: Arc::new(DigestSynthesizer),
            proposer: Arc::new(proposer),
            digest_chars: config.summary_digest_chars,
            registry,
            observer,
        }
    }

    #[must_use]
    pub fn with_planner(mut self, planner: Arc<dyn ExecutionPlanner>) -> Self {
        self.planner = planner;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn PlanExecutor>) -> Self {
        self.executor = executor;
        self
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn ResponseVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn ResponseSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    #[must_use]
    pub fn with_proposer(mut self, proposer: Arc<dyn ToolCallProposer>) -> Self {
        self.proposer = proposer;
        self
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<dyn RunLedger> {
        &self.ledger
    }

    pub async fn handle_agent_turn(
        &self,
        role: Role,
        user_id: &str,
        task_text: &str,
        turn: &TurnContext,
    ) -> Result<TurnOutcome, AgentGateError> {
        let started = Instant::now();
        let decision = FeatureGate::new(&turn.rollout).decide(role);
        let run_id = self.ledger.start_run(role, user_id, task_text).await?;

        tracing::info!(
            run_id = %run_id,
            role = %role,
            planned = decision.uses_planned_path(),
            parallel_reads = decision.executes_planned_reads(),
            verifier = decision.verifies(),
            "agent turn started"
        );
        self.observer.record_event(&ObserverEvent::RunStarted {
            run_id: run_id.clone(),
            role: role.to_string(),
            path: if decision.uses_planned_path() {
                "planned".to_string()
            } else {
                ExecutionPath::Legacy.to_string()
            },
        });

        let ctx = ToolContext::new(&run_id, role, user_id)
            .with_branch_aware_approvals(decision.branch_aware_approvals);
        let result = self.run_turn(&decision, ctx, task_text, turn).await;
        self.finish_run(&run_id, started, result).await
    }

    async fn run_turn(
        &self,
        decision: &RolloutDecision,
        ctx: ToolContext,
        task_text: &str,
        turn: &TurnContext,
    ) -> Result<TurnOutcome, AgentGateError> {
        let ctx = match &turn.approved_gate_id {
            Some(gate_id) => {
                let gate = self.load_gate(gate_id).await?;
                ctx.with_scoped_approval(gate.gate_id, gate.tool_name)
            }
            None => ctx,
        };

        let mut fallback_reason = None;
        if decision.uses_planned_path() {
            let planning = PlanningContext {
                parallel_reads: decision.executes_planned_reads(),
                intent_hint: turn.intent_hint.clone(),
            };
            match self
                .planner
                .build_execution_plan(ctx.role, task_text, &planning)
                .await
            {
                Ok(plan) => return self.run_planned(decision, &ctx, task_text, plan).await,
                Err(error) => {
                    tracing::warn!(run_id = %ctx.run_id, role = %ctx.role, error = %error, "planning failed, using legacy path");
                    self.observer.record_event(&ObserverEvent::PlanningFallback {
                        run_id: ctx.run_id.clone(),
                        reason: error.to_string(),
                    });
                    fallback_reason = Some(error.to_string());
                }
            }
        }

        let mut outcome = self.run_legacy(&ctx, task_text, turn).await?;
        outcome.fallback_reason = fallback_reason;
        Ok(outcome)
    }

    async fn run_planned(
        &self,
        decision: &RolloutDecision,
        ctx: &ToolContext,
        task_text: &str,
        plan: ExecutionPlan,
    ) -> Result<TurnOutcome, AgentGateError> {
        self.ledger
            .update_run_planning_metadata(&ctx.run_id, plan.planning_metadata())
            .await?;
        self.observer.record_event(&ObserverEvent::PlanBuilt {
            run_id: ctx.run_id.clone(),
            plan_id: plan.plan_id().to_string(),
            workflow_type: plan.workflow_type().to_string(),
            planned_nodes: plan.summary().planned_nodes,
            parallel_nodes: plan.summary().parallel_nodes,
        });

        let (path, report) = if decision.executes_planned_reads() {
            let mut report = self.executor.execute_planned_read_nodes(&plan, ctx).await;
            if !report.deferred_nodes.is_empty() {
                self.sequential.dispatch(&plan, ctx, &mut report).await;
            }
            (ExecutionPath::PlannedParallel, report)
        } else {
            let mut report = PlanExecutionReport::new(plan.plan_id());
            self.sequential.dispatch(&plan, ctx, &mut report).await;
            (ExecutionPath::PlannedSequential, report)
        };

        let draft = self
            .synthesizer
            .synthesize(task_text, &plan, &report)
            .await?;

        let verification = if decision.verifies() {
            let verdict = self
                .verifier
                .verify_planned_response(&plan, &report, &draft)
                .await;
            if !verdict.is_verified() {
                tracing::warn!(run_id = %ctx.run_id, issues = ?verdict.issue_lines(), "response flagged by verifier");
            }
            self.observer.record_event(&ObserverEvent::Verified {
                run_id: ctx.run_id.clone(),
                status: verdict.status.to_string(),
                issues: verdict.issues.len(),
            });
            Some(verdict)
        } else {
            None
        };

        let pending_approvals = report
            .pending_approvals()
            .filter_map(|result| {
                result.gate_id.as_ref().map(|gate_id| PendingApproval {
                    gate_id: gate_id.clone(),
                    tool_name: result.tool_name.clone(),
                    node_id: Some(result.node_id.clone()),
                })
            })
            .collect();

        Ok(TurnOutcome {
            run_id: ctx.run_id.clone(),
            path,
            plan: Some(plan),
            report: Some(report),
            tool_calls: Vec::new(),
            response: draft,
            verification,
            pending_approvals,
            fallback_reason: None,
        })
    }

    async fn run_legacy(
        &self,
        ctx: &ToolContext,
        task_text: &str,
        turn: &TurnContext,
    ) -> Result<TurnOutcome, AgentGateError> {
        let calls = self
            .proposer
            .propose_tool_calls(ctx.role, task_text, turn.intent_hint.as_deref())
            .await?;
        let records = run_sequential_calls(&self.registry, calls, ctx).await;
        let pending_approvals = records
            .iter()
            .filter_map(|record| {
                record.gate_id.as_ref().map(|gate_id| PendingApproval {
                    gate_id: gate_id.clone(),
                    tool_name: record.tool_name.clone(),
                    node_id: None,
                })
            })
            .collect();

        Ok(TurnOutcome {
            run_id: ctx.run_id.clone(),
            path: ExecutionPath::Legacy,
            plan: None,
            report: None,
            response: render_legacy_response(&records, self.digest_chars),
            tool_calls: records,
            verification: None,
            pending_approvals,
            fallback_reason: None,
        })
    }

    async fn finish_run(
        &self,
        run_id: &str,
        started: Instant,
        result: Result<TurnOutcome, AgentGateError>,
    ) -> Result<TurnOutcome, AgentGateError> {
        let elapsed = started.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let (status, metadata) = match &result {
            Ok(outcome) => (RunStatus::Completed, outcome.metadata()),
            Err(error) => (
                RunStatus::Failed,
                RunMetadata {
                    error: Some(error.to_string()),
                    ..RunMetadata::default()
                },
            ),
        };

        let completed = self
            .ledger
            .complete_run(run_id, status, duration_ms, 0, metadata)
            .await;
        self.observer.record_event(&ObserverEvent::RunCompleted {
            run_id: run_id.to_string(),
            status: status.to_string(),
            duration: elapsed,
        });

        match (result, completed) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(error)) => Err(error.into()),
            (Err(error), completed) => {
                if let Err(ledger_error) = completed {
                    tracing::error!(run_id = %run_id, error = %ledger_error, "failed to record failed run");
                }
                Err(error)
            }
        }
    }

    async fn load_gate(&self, gate_id: &str) -> Result<Gate, AgentGateError> {
        self.ledger
            .get_gate(gate_id)
            .await?
            .ok_or_else(|| ApprovalError::GateNotFound(gate_id.to_string()).into())
    }

    /// Execute the call an approved gate was opened for, in a new run.
    ///
    /// The gate may come from an earlier run; it authorizes exactly the
    /// recorded tool and params, once.
    pub async fn resume_tool_call(
        &self,
        role: Role,
        user_id: &str,
        gate_id: &str,
    ) -> Result<ToolOutcome, AgentGateError> {
        let started = Instant::now();
        let gate = self.load_gate(gate_id).await?;
        let run_id = self
            .ledger
            .start_run(role, user_id, &format!("resume {}", gate.tool_name))
            .await?;
        let ctx = ToolContext::new(&run_id, role, user_id)
            .with_approved_gate(Some(gate.gate_id.clone()));

        let outcome = match gate.tool_name.split_once('.') {
            Some((router, action)) => self
                .registry
                .execute_tool(ToolCall::new(router, action, gate.params.clone()), &ctx)
                .await
                .map_err(AgentGateError::from),
            None => Err(ToolError::RouterNotFound {
                router: gate.tool_name.clone(),
            }
            .into()),
        };

        let elapsed = started.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let (status, metadata) = match &outcome {
            Ok(_) => (
                RunStatus::Completed,
                RunMetadata {
                    execution_path: Some(ExecutionPath::Legacy.to_string()),
                    ..RunMetadata::default()
                },
            ),
            Err(error) => (
                RunStatus::Failed,
                RunMetadata {
                    execution_path: Some(ExecutionPath::Legacy.to_string()),
                    error: Some(error.to_string()),
                    ..RunMetadata::default()
                },
            ),
        };
        self.ledger
            .complete_run(&run_id, status, duration_ms, 0, metadata)
            .await?;
        self.observer.record_event(&ObserverEvent::RunCompleted {
            run_id,
            status: status.to_string(),
            duration: elapsed,
        });
        outcome
    }

    /// Record a reviewer's decision on a pending gate.
    pub async fn resolve_gate(
        &self,
        gate_id: &str,
        decision: ApprovalDecision,
        decided_by: &str,
        reason: Option<String>,
    ) -> Result<Gate, AgentGateError> {
        Ok(self
            .registry
            .approvals()
            .resolve_gate(gate_id, decision, decided_by, reason)
            .await?)
    }
}
