//! Approval coordinator: two-phase protocol for `execute_high` actions.
//!
//! `propose` opens (or reuses) a pending gate for a `(run, tool, params)`
//! triple without running anything. A reviewer resolves the gate once. The
//! caller then resubmits the identical call carrying the gate id, and
//! `authorize` consumes the approval so the handler runs at most once.

mod fingerprint;

pub use fingerprint::params_fingerprint;

use crate::error::{ApprovalError, LedgerError, ToolError};
use crate::ledger::{Gate, GateFilter, GateResolution, GateStatus, NewGate, RunLedger};
use crate::observability::{Observer, ObserverEvent};
use crate::rollout::Role;
use crate::tools::ToolContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalDecision {
    #[strum(to_string = "approved", serialize = "approve")]
    Approved,
    #[strum(to_string = "rejected", serialize = "reject")]
    Rejected,
}

impl From<ApprovalDecision> for GateStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => Self::Approved,
            ApprovalDecision::Rejected => Self::Rejected,
        }
    }
}

pub struct ApprovalCoordinator {
    ledger: Arc<dyn RunLedger>,
    observer: Arc<dyn Observer>,
    /// Serializes proposals so concurrent duplicates resolve to one gate.
    propose_lock: tokio::sync::Mutex<()>,
}

impl ApprovalCoordinator {
    pub fn new(ledger: Arc<dyn RunLedger>, observer: Arc<dyn Observer>) -> Self {
        Self {
            ledger,
            observer,
            propose_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Open a gate for this call, or return the one already open for the
    /// same run, tool and params.
    ///
    /// A rejected gate for the same identity blocks the call for the rest
    /// of the run. An approved but consumed gate means the action already
    /// ran, so a fresh gate is opened.
    pub async fn propose(
        &self,
        ctx: &ToolContext,
        tool_name: &str,
        params: &Value,
    ) -> Result<Gate, ToolError> {
        let fingerprint = params_fingerprint(params);
        let _guard = self.propose_lock.lock().await;

        let existing = self
            .ledger
            .list_gates(GateFilter::default().for_run(ctx.run_id.clone()))
            .await?
            .into_iter()
            .rev()
            .find(|gate| gate.tool_name == tool_name && gate.params_fingerprint == fingerprint);

        if let Some(gate) = existing {
            match gate.status {
                GateStatus::Rejected => {
                    return Err(ToolError::ApprovalDenied {
                        tool_name: tool_name.to_string(),
                        gate_id: gate.gate_id,
                    });
                }
                GateStatus::Pending => return Ok(gate),
                GateStatus::Approved if gate.consumed_at.is_none() => return Ok(gate),
                GateStatus::Approved => {}
            }
        }

        let node = ctx.node.as_ref().filter(|_| ctx.branch_aware_approvals);
        let gate = self
            .ledger
            .create_gate(NewGate {
                run_id: ctx.run_id.clone(),
                role: ctx.role,
                user_id: ctx.user_id.clone(),
                tool_name: tool_name.to_string(),
                params: params.clone(),
                params_fingerprint: fingerprint,
                node_id: node.map(|n| n.node_id.clone()),
                branch_id: node.map(|n| n.branch_id.clone()),
                execution_mode: node.map(|n| n.execution_mode),
            })
            .await?;

        tracing::info!(
            run_id = %gate.run_id,
            gate_id = %gate.gate_id,
            tool = %gate.tool_name,
            "approval gate opened"
        );
        self.observer.record_event(&ObserverEvent::GateOpened {
            run_id: gate.run_id.clone(),
            gate_id: gate.gate_id.clone(),
            tool_name: gate.tool_name.clone(),
        });
        Ok(gate)
    }

    /// Record the reviewer's decision. A gate can be resolved exactly once.
    pub async fn resolve_gate(
        &self,
        gate_id: &str,
        decision: ApprovalDecision,
        decided_by: &str,
        reason: Option<String>,
    ) -> Result<Gate, ApprovalError> {
        let resolution = GateResolution {
            status: decision.into(),
            decided_by: decided_by.to_string(),
            reason,
        };
        let gate = self
            .ledger
            .resolve_gate(gate_id, resolution)
            .await
            .map_err(|error| match error {
                LedgerError::GateNotFound(id) => ApprovalError::GateNotFound(id),
                LedgerError::GateAlreadyResolved { gate_id, status } => {
                    ApprovalError::AlreadyResolved { gate_id, status }
                }
                other => ApprovalError::Ledger(other),
            })?;

        tracing::info!(
            gate_id = %gate.gate_id,
            status = %gate.status,
            decided_by = %decided_by,
            "approval gate resolved"
        );
        self.observer.record_event(&ObserverEvent::GateResolved {
            gate_id: gate.gate_id.clone(),
            status: gate.status.to_string(),
        });
        Ok(gate)
    }

    /// Check that `gate_id` approves exactly this call and consume it.
    pub async fn authorize(
        &self,
        gate_id: &str,
        ctx: &ToolContext,
        tool_name: &str,
        params: &Value,
    ) -> Result<Gate, ToolError> {
        let gate = self
            .ledger
            .get_gate(gate_id)
            .await?
            .ok_or_else(|| ApprovalError::GateNotFound(gate_id.to_string()))?;

        if gate.tool_name != tool_name
            || gate.role != ctx.role
            || gate.params_fingerprint != params_fingerprint(params)
        {
            return Err(ToolError::GateMismatch {
                tool_name: tool_name.to_string(),
                gate_id: gate_id.to_string(),
            });
        }

        match gate.status {
            GateStatus::Pending => Err(ToolError::ApprovalPending {
                tool_name: tool_name.to_string(),
                gate_id: gate_id.to_string(),
            }),
            GateStatus::Rejected => Err(ToolError::ApprovalDenied {
                tool_name: tool_name.to_string(),
                gate_id: gate_id.to_string(),
            }),
            GateStatus::Approved => {
                self.ledger
                    .consume_gate(gate_id)
                    .await
                    .map_err(|error| match error {
                        LedgerError::GateAlreadyConsumed(_) => ToolError::GateConsumed {
                            tool_name: tool_name.to_string(),
                            gate_id: gate_id.to_string(),
                        },
                        other => ToolError::Ledger(other),
                    })
            }
        }
    }

    /// Pending gates, oldest first, optionally narrowed to a run or role.
    pub async fn get_pending_approval_queue(
        &self,
        run_id: Option<&str>,
        role: Option<Role>,
    ) -> Result<Vec<Gate>, ApprovalError> {
        let mut filter = GateFilter::pending();
        filter.run_id = run_id.map(str::to_string);
        filter.role = role;
        Ok(self.ledger.list_gates(filter).await?)
    }
}
