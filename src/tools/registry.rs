use super::traits::{ActionHandler, MiddlewareDecision, ToolContext, ToolMiddleware};
use super::types::{ActionSpec, RouterSpec, Tier, ToolCall, ToolOutcome};
use crate::approval::ApprovalCoordinator;
use crate::error::ToolError;
use crate::ledger::{NewStep, RunLedger, StepStatus};
use crate::rollout::Role;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

struct RegisteredAction {
    tier: Tier,
    handler: Arc<dyn ActionHandler>,
}

/// A named group of actions sharing one role allow-list.
pub struct RouterDefinition {
    name: String,
    allowed_roles: Vec<Role>,
    actions: BTreeMap<String, RegisteredAction>,
}

impl RouterDefinition {
    pub fn new(name: impl Into<String>, allowed_roles: &[Role]) -> Self {
        Self {
            name: name.into(),
            allowed_roles: allowed_roles.to_vec(),
            actions: BTreeMap::new(),
        }
    }

    /// Register an action. Replaces any existing action with the same name.
    #[must_use]
    pub fn action(
        mut self,
        name: impl Into<String>,
        tier: Tier,
        handler: impl ActionHandler + 'static,
    ) -> Self {
        self.actions.insert(
            name.into(),
            RegisteredAction {
                tier,
                handler: Arc::new(handler),
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }

    fn spec(&self) -> RouterSpec {
        RouterSpec {
            name: self.name.clone(),
            allowed_roles: self.allowed_roles.clone(),
            actions: self
                .actions
                .iter()
                .map(|(name, action)| ActionSpec {
                    name: name.clone(),
                    tier: action.tier,
                })
                .collect(),
        }
    }
}

/// Routers by name, with the middleware pipeline and the approval gate in
/// front of every handler.
pub struct ActionRegistry {
    routers: HashMap<String, RouterDefinition>,
    middleware: Vec<Arc<dyn ToolMiddleware>>,
    ledger: Arc<dyn RunLedger>,
    approvals: Arc<ApprovalCoordinator>,
}

impl ActionRegistry {
    pub fn new(
        ledger: Arc<dyn RunLedger>,
        approvals: Arc<ApprovalCoordinator>,
        middleware: Vec<Arc<dyn ToolMiddleware>>,
    ) -> Self {
        Self {
            routers: HashMap::new(),
            middleware,
            ledger,
            approvals,
        }
    }

    /// Register a router. Replaces any existing router with the same name.
    pub fn register(&mut self, router: RouterDefinition) {
        self.routers.insert(router.name.clone(), router);
    }

    pub fn approvals(&self) -> &Arc<ApprovalCoordinator> {
        &self.approvals
    }

    pub fn ledger(&self) -> &Arc<dyn RunLedger> {
        &self.ledger
    }

    pub fn tier_of(&self, router: &str, action: &str) -> Option<Tier> {
        self.routers
            .get(router)
            .and_then(|def| def.actions.get(action))
            .map(|action| action.tier)
    }

    pub fn router_allows(&self, router: &str, role: Role) -> bool {
        self.routers.get(router).is_some_and(|def| def.allows(role))
    }

    /// Router specs sorted by name, optionally limited to one role.
    pub fn router_specs(&self, role: Option<Role>) -> Vec<RouterSpec> {
        let mut specs: Vec<RouterSpec> = self
            .routers
            .values()
            .filter(|def| role.is_none_or(|role| def.allows(role)))
            .map(RouterDefinition::spec)
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Dispatch one call.
    ///
    /// Role isolation is checked before anything else. `read` and
    /// `execute_low` actions run immediately. `execute_high` actions without
    /// an approved gate open one and return [`ToolOutcome::ApprovalRequired`]
    /// without touching the handler.
    pub async fn execute_tool(
        &self,
        call: ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let tool_name = call.tool_name();
        let router = self
            .routers
            .get(&call.router)
            .ok_or_else(|| ToolError::RouterNotFound {
                router: call.router.clone(),
            })?;

        if !router.allows(ctx.role) {
            tracing::warn!(
                tool = %tool_name,
                role = %ctx.role,
                run_id = %ctx.run_id,
                "router call rejected for role"
            );
            return Err(ToolError::ForbiddenRole {
                router: call.router.clone(),
                role: ctx.role.to_string(),
            });
        }

        let action = router
            .actions
            .get(&call.action)
            .ok_or_else(|| ToolError::ActionNotFound {
                router: call.router.clone(),
                action: call.action.clone(),
            })?;

        for middleware in &self.middleware {
            match middleware.before_execute(&tool_name, &call.params, ctx).await {
                Ok(MiddlewareDecision::Continue) => {}
                Ok(MiddlewareDecision::Block(reason)) => {
                    return Err(ToolError::Blocked { tool_name, reason });
                }
                Err(error) => {
                    return Err(ToolError::Blocked {
                        tool_name,
                        reason: error.to_string(),
                    });
                }
            }
        }

        if action.tier.requires_approval() {
            match ctx.approved_gate_for(&tool_name) {
                None => return self.open_gate(&call, action.tier, &tool_name, ctx).await,
                Some(gate_id) => {
                    if let Err(error) = self
                        .approvals
                        .authorize(gate_id, ctx, &tool_name, &call.params)
                        .await
                    {
                        if error.is_terminal_denial()
                            || matches!(error, ToolError::GateMismatch { .. })
                        {
                            let mut step = new_step(&call, action.tier, ctx, StepStatus::Denied);
                            step.error = Some(error.to_string());
                            self.ledger.log_step(&ctx.run_id, step).await?;
                        }
                        return Err(error);
                    }
                }
            }
        }

        self.invoke(call, action, tool_name, ctx).await
    }

    async fn open_gate(
        &self,
        call: &ToolCall,
        tier: Tier,
        tool_name: &str,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        match self.approvals.propose(ctx, tool_name, &call.params).await {
            Ok(gate) => {
                let mut step = new_step(call, tier, ctx, StepStatus::ApprovalRequired);
                step.result = serde_json::json!({ "gate_id": gate.gate_id });
                self.ledger.log_step(&ctx.run_id, step).await?;
                Ok(ToolOutcome::ApprovalRequired {
                    tool_name: tool_name.to_string(),
                    gate_id: gate.gate_id,
                })
            }
            Err(error) => {
                if error.is_terminal_denial() {
                    let mut step = new_step(call, tier, ctx, StepStatus::Denied);
                    step.error = Some(error.to_string());
                    self.ledger.log_step(&ctx.run_id, step).await?;
                }
                Err(error)
            }
        }
    }

    async fn invoke(
        &self,
        call: ToolCall,
        action: &RegisteredAction,
        tool_name: String,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let started = Instant::now();
        let outcome = action.handler.call(ctx, call.params.clone()).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(mut result) => {
                for middleware in &self.middleware {
                    middleware.after_execute(&tool_name, &mut result, ctx).await;
                }
                let mut step = new_step(&call, action.tier, ctx, StepStatus::Executed);
                step.result = result.clone();
                step.latency_ms = latency_ms;
                self.ledger.log_step(&ctx.run_id, step).await?;
                Ok(ToolOutcome::Completed { tool_name, result })
            }
            Err(error) => {
                let message = format!("{error:#}");
                let mut step = new_step(&call, action.tier, ctx, StepStatus::Failed);
                step.error = Some(message.clone());
                step.latency_ms = latency_ms;
                self.ledger.log_step(&ctx.run_id, step).await?;
                Err(ToolError::Handler { tool_name, message })
            }
        }
    }
}

fn new_step(call: &ToolCall, tier: Tier, ctx: &ToolContext, status: StepStatus) -> NewStep {
    let node = ctx.node.as_ref();
    NewStep {
        router: call.router.clone(),
        action: call.action.clone(),
        tier,
        params: call.params.clone(),
        result: Value::Null,
        status,
        latency_ms: 0,
        error: None,
        node_id: node.map(|n| n.node_id.clone()),
        branch_id: node.map(|n| n.branch_id.clone()),
        join_key: node.map(|n| n.join_key.clone()),
        execution_mode: node.map(|n| n.execution_mode),
    }
}
