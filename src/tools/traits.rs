use super::types::{NodeBinding, UpstreamResult};
use crate::rollout::Role;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'a>>;

/// Per-call context threaded from the turn into every router call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run_id: String,
    pub role: Role,
    pub user_id: String,
    /// Gate that authorizes an `execute_high` call being resubmitted.
    pub approved_gate_id: Option<String>,
    /// Tool the approved gate was opened for. When set, calls to other
    /// tools ignore the gate.
    pub approved_tool: Option<String>,
    /// Plan position when the call comes from a plan node.
    pub node: Option<NodeBinding>,
    /// Record node and branch ids on gates opened by this call.
    pub branch_aware_approvals: bool,
    pub upstream: Vec<UpstreamResult>,
}

impl ToolContext {
    pub fn new(run_id: impl Into<String>, role: Role, user_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            role,
            user_id: user_id.into(),
            approved_gate_id: None,
            approved_tool: None,
            node: None,
            branch_aware_approvals: false,
            upstream: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_approved_gate(mut self, gate_id: Option<String>) -> Self {
        self.approved_gate_id = gate_id;
        self
    }

    /// Carry `gate_id` only into calls of `tool_name`.
    #[must_use]
    pub fn with_scoped_approval(mut self, gate_id: String, tool_name: String) -> Self {
        self.approved_gate_id = Some(gate_id);
        self.approved_tool = Some(tool_name);
        self
    }

    /// The gate that authorizes a call of `tool_name`, if any.
    pub fn approved_gate_for(&self, tool_name: &str) -> Option<&str> {
        let gate_id = self.approved_gate_id.as_deref()?;
        match &self.approved_tool {
            Some(tool) if tool != tool_name => None,
            _ => Some(gate_id),
        }
    }

    #[must_use]
    pub fn with_branch_aware_approvals(mut self, enabled: bool) -> Self {
        self.branch_aware_approvals = enabled;
        self
    }

    /// Derive the context for one plan node.
    #[must_use]
    pub fn for_node(&self, node: NodeBinding, upstream: Vec<UpstreamResult>) -> Self {
        Self {
            node: Some(node),
            upstream,
            ..self.clone()
        }
    }
}

/// Business logic behind one router action.
pub trait ActionHandler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a ToolContext, params: Value) -> HandlerFuture<'a>;
}

/// Adapts an async closure `(user_id, params)` into an [`ActionHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(String, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn call<'a>(&'a self, ctx: &'a ToolContext, params: Value) -> HandlerFuture<'a> {
        Box::pin((self.f)(ctx.user_id.clone(), params))
    }
}

/// Handler returning a fixed payload.
pub struct StaticHandler(pub Value);

impl ActionHandler for StaticHandler {
    fn call<'a>(&'a self, _ctx: &'a ToolContext, _params: Value) -> HandlerFuture<'a> {
        let value = self.0.clone();
        Box::pin(async move { Ok(value) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareDecision {
    Continue,
    Block(String),
}

pub trait ToolMiddleware: Send + Sync + std::fmt::Debug {
    fn before_execute<'a>(
        &'a self,
        tool_name: &'a str,
        params: &'a Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<MiddlewareDecision>> + Send + 'a>>;

    fn after_execute<'a>(
        &'a self,
        tool_name: &'a str,
        result: &'a mut Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_approval_applies_to_one_tool() {
        let ctx = ToolContext::new("run_1", Role::Recruiter, "u1").with_scoped_approval(
            "gate_1".into(),
            "recruiter_paid_media.create_campaign".into(),
        );
        assert_eq!(
            ctx.approved_gate_for("recruiter_paid_media.create_campaign"),
            Some("gate_1")
        );
        assert_eq!(ctx.approved_gate_for("recruiter_pipeline.bulk_update_stage"), None);

        let unscoped = ToolContext::new("run_1", Role::Recruiter, "u1")
            .with_approved_gate(Some("gate_2".into()));
        assert_eq!(unscoped.approved_gate_for("anything.at_all"), Some("gate_2"));
    }
}
