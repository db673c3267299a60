use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `agentgate`.
///
/// Each subsystem defines its own error enum. Callers match on these to decide
/// whether a failure is fatal to the turn, to a single tool call, or only to
/// one plan node. Tool handlers and the CLI continue to use `anyhow::Result`
/// for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AgentGateError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Planning ─────────────────────────────────────────────────────────
    #[error("planning: {0}")]
    Planning(#[from] PlanningError),

    // ── Tools / Router ───────────────────────────────────────────────────
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    // ── Approvals ────────────────────────────────────────────────────────
    #[error("approval: {0}")]
    Approval(#[from] ApprovalError),

    // ── Run ledger ───────────────────────────────────────────────────────
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Planning errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("no workflow mapping for role {role}")]
    NoWorkflowForRole { role: String },

    #[error("invalid plan graph: {0}")]
    InvalidGraph(String),

    #[error("plan node {node_id} references unknown action {tool}.{action}")]
    UnknownAction {
        node_id: String,
        tool: String,
        action: String,
    },

    #[error("intent classification failed: {0}")]
    Classification(String),
}

// ─── Tool / Router errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("router {router} not found")]
    RouterNotFound { router: String },

    #[error("action {action} not found on router {router}")]
    ActionNotFound { router: String, action: String },

    #[error("role {role} is not allowed to call router {router}")]
    ForbiddenRole { router: String, role: String },

    #[error("approval denied for {tool_name} (gate {gate_id})")]
    ApprovalDenied { tool_name: String, gate_id: String },

    #[error("gate {gate_id} for {tool_name} is still pending")]
    ApprovalPending { tool_name: String, gate_id: String },

    #[error("gate {gate_id} does not authorize {tool_name} with these params")]
    GateMismatch { tool_name: String, gate_id: String },

    #[error("gate {gate_id} has already been used to execute {tool_name}")]
    GateConsumed { tool_name: String, gate_id: String },

    #[error("tool {tool_name} blocked: {reason}")]
    Blocked { tool_name: String, reason: String },

    #[error("tool {tool_name} execution failed: {message}")]
    Handler { tool_name: String, message: String },

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ToolError {
    /// Terminal denials must surface to the caller and never be retried.
    pub fn is_terminal_denial(&self) -> bool {
        matches!(
            self,
            Self::ApprovalDenied { .. } | Self::ForbiddenRole { .. } | Self::GateConsumed { .. }
        )
    }
}

// ─── Approval errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("gate {0} not found")]
    GateNotFound(String),

    #[error("gate {gate_id} already resolved as {status}")]
    AlreadyResolved { gate_id: String, status: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ─── Ledger errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("run {0} not found")]
    RunNotFound(String),

    #[error("run {run_id} already completed as {status}")]
    RunAlreadyCompleted { run_id: String, status: String },

    #[error("gate {0} not found")]
    GateNotFound(String),

    #[error("gate {gate_id} already resolved as {status}")]
    GateAlreadyResolved { gate_id: String, status: String },

    #[error("gate {0} is not approved")]
    GateNotApproved(String),

    #[error("gate {0} already consumed")]
    GateAlreadyConsumed(String),

    #[error("journal: {0}")]
    Journal(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AgentGateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = AgentGateError::Config(ConfigError::Validation("bad concurrency".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn forbidden_role_names_router_and_role() {
        let err = ToolError::ForbiddenRole {
            router: "admin_portal".into(),
            role: "driver".into(),
        };
        assert_eq!(
            err.to_string(),
            "role driver is not allowed to call router admin_portal"
        );
        assert!(err.is_terminal_denial());
    }

    #[test]
    fn approval_pending_is_not_terminal() {
        let err = ToolError::ApprovalPending {
            tool_name: "recruiter_paid_media.create_campaign".into(),
            gate_id: "gate_1".into(),
        };
        assert!(!err.is_terminal_denial());
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: AgentGateError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn ledger_error_nests_under_tool_error() {
        let err = ToolError::from(LedgerError::RunNotFound("run_x".into()));
        assert_eq!(err.to_string(), "run run_x not found");
    }
}
