//! Read-side projections over a [`RunLedger`]: per-run execution traces,
//! recent-run listings and the gate audit trail.

use super::types::{Gate, GateFilter, GateStatus, PlanningMetadata, Run, Step};
use super::RunLedger;
use crate::error::LedgerError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const UNPLANNED_BRANCH: &str = "unplanned";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifierTrace {
    pub status: String,
    pub verifier_type: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    pub branch_count: usize,
    pub node_count: usize,
    pub step_count: usize,
    pub gate_count: usize,
    /// Latency of the slowest branch; branches run concurrently, steps inside
    /// a branch run one after another.
    pub critical_path_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchTrace {
    pub branch_id: String,
    pub step_count: usize,
    pub gate_count: usize,
    pub total_latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Step,
    Gate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub at: String,
    pub kind: TimelineKind,
    pub tool_name: String,
    pub status: String,
    pub node_id: Option<String>,
    pub branch_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionTrace {
    pub run: Run,
    pub plan: Option<PlanningMetadata>,
    pub verifier: Option<VerifierTrace>,
    pub execution: ExecutionStats,
    pub branches: Vec<BranchTrace>,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateAuditEntry {
    pub gate_id: String,
    pub run_id: String,
    pub tool_name: String,
    pub status: GateStatus,
    pub decided_by: Option<String>,
    pub reason: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub consumed_at: Option<String>,
    pub node_id: Option<String>,
    pub branch_id: Option<String>,
}

impl From<Gate> for GateAuditEntry {
    fn from(gate: Gate) -> Self {
        Self {
            gate_id: gate.gate_id,
            run_id: gate.run_id,
            tool_name: gate.tool_name,
            status: gate.status,
            decided_by: gate.decided_by,
            reason: gate.reason,
            created_at: gate.created_at,
            resolved_at: gate.resolved_at,
            consumed_at: gate.consumed_at,
            node_id: gate.node_id,
            branch_id: gate.branch_id,
        }
    }
}

fn branch_key(branch_id: Option<&String>) -> String {
    branch_id.map_or_else(|| UNPLANNED_BRANCH.to_string(), Clone::clone)
}

fn build_trace(run: Run, steps: &[Step], gates: &[Gate]) -> ExecutionTrace {
    let mut branches: BTreeMap<String, BranchTrace> = BTreeMap::new();
    let mut nodes = BTreeSet::new();

    for step in steps {
        let key = branch_key(step.branch_id.as_ref());
        let branch = branches.entry(key.clone()).or_insert_with(|| BranchTrace {
            branch_id: key,
            step_count: 0,
            gate_count: 0,
            total_latency_ms: 0,
        });
        branch.step_count += 1;
        branch.total_latency_ms = branch.total_latency_ms.saturating_add(step.latency_ms);
        if let Some(node_id) = &step.node_id {
            nodes.insert(node_id.clone());
        }
    }
    for gate in gates {
        let key = branch_key(gate.branch_id.as_ref());
        branches
            .entry(key.clone())
            .or_insert_with(|| BranchTrace {
                branch_id: key,
                step_count: 0,
                gate_count: 0,
                total_latency_ms: 0,
            })
            .gate_count += 1;
    }

    let mut timeline: Vec<TimelineEntry> = steps
        .iter()
        .map(|step| TimelineEntry {
            at: step.recorded_at.clone(),
            kind: TimelineKind::Step,
            tool_name: step.tool_name(),
            status: step.status.to_string(),
            node_id: step.node_id.clone(),
            branch_id: step.branch_id.clone(),
        })
        .chain(gates.iter().map(|gate| TimelineEntry {
            at: gate.created_at.clone(),
            kind: TimelineKind::Gate,
            tool_name: gate.tool_name.clone(),
            status: gate.status.to_string(),
            node_id: gate.node_id.clone(),
            branch_id: gate.branch_id.clone(),
        }))
        .collect();
    timeline.sort_by(|a, b| a.at.cmp(&b.at));

    let verifier = run
        .metadata
        .verifier_status
        .as_ref()
        .map(|status| VerifierTrace {
            status: status.clone(),
            verifier_type: run.metadata.verifier_type.clone(),
            issues: run.metadata.verifier_issues.clone(),
        });

    let branches: Vec<BranchTrace> = branches.into_values().collect();
    let execution = ExecutionStats {
        branch_count: branches.len(),
        node_count: nodes.len(),
        step_count: steps.len(),
        gate_count: gates.len(),
        critical_path_ms: branches
            .iter()
            .map(|branch| branch.total_latency_ms)
            .max()
            .unwrap_or(0),
    };

    ExecutionTrace {
        plan: run.planning.clone(),
        verifier,
        execution,
        branches,
        timeline,
        run,
    }
}

/// Full trace of one run: plan, verifier verdict, per-branch counts and a
/// merged timeline of steps and gates.
pub async fn execution_trace(
    ledger: &dyn RunLedger,
    run_id: &str,
) -> Result<ExecutionTrace, LedgerError> {
    let run = ledger
        .get_run(run_id)
        .await?
        .ok_or_else(|| LedgerError::RunNotFound(run_id.to_string()))?;
    let steps = ledger.list_steps(run_id).await?;
    let gates = ledger
        .list_gates(GateFilter::default().for_run(run_id))
        .await?;
    Ok(build_trace(run, &steps, &gates))
}

/// Traces for the `limit` most recent runs, newest first.
pub async fn recent_runs_with_execution(
    ledger: &dyn RunLedger,
    limit: usize,
) -> Result<Vec<ExecutionTrace>, LedgerError> {
    let mut traces = Vec::new();
    for run in ledger.recent_runs(limit).await? {
        let steps = ledger.list_steps(&run.run_id).await?;
        let gates = ledger
            .list_gates(GateFilter::default().for_run(run.run_id.clone()))
            .await?;
        traces.push(build_trace(run, &steps, &gates));
    }
    Ok(traces)
}

/// Gate totals plus one entry per gate, for approval audits.
#[derive(Debug, Clone, Serialize)]
pub struct GateAudit {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    /// Approved share of resolved gates; `None` until something resolved.
    pub approval_rate: Option<f64>,
    pub gates: Vec<GateAuditEntry>,
}

pub async fn gate_audit(
    ledger: &dyn RunLedger,
    filter: GateFilter,
) -> Result<GateAudit, LedgerError> {
    let gates: Vec<GateAuditEntry> = ledger
        .list_gates(filter)
        .await?
        .into_iter()
        .map(GateAuditEntry::from)
        .collect();
    let count = |status: GateStatus| gates.iter().filter(|g| g.status == status).count();
    let approved = count(GateStatus::Approved);
    let rejected = count(GateStatus::Rejected);
    let pending = count(GateStatus::Pending);
    let resolved = approved + rejected;

    #[allow(clippy::cast_precision_loss)]
    let approval_rate = (resolved > 0).then(|| approved as f64 / resolved as f64);

    Ok(GateAudit {
        total: gates.len(),
        approved,
        rejected,
        pending,
        approval_rate,
        gates,
    })
}
