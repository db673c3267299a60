use crate::executor::digest;
use crate::planner::{IntentClassifier, WorkflowCatalog};
use crate::rollout::Role;
use crate::tools::{ActionRegistry, ToolCall, ToolContext, ToolOutcome};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type ProposalFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<ToolCall>>> + Send + 'a>>;

/// Chooses the router calls for a turn on the legacy sequential path.
pub trait ToolCallProposer: Send + Sync {
    fn propose_tool_calls<'a>(
        &'a self,
        role: Role,
        task_text: &'a str,
        intent_hint: Option<&'a str>,
    ) -> ProposalFuture<'a>;
}

/// Proposes the read calls the role's workflow would make for the
/// classified intent, in catalog order.
pub struct CatalogToolProposer {
    catalog: WorkflowCatalog,
    classifier: Arc<dyn IntentClassifier>,
    registry: Arc<ActionRegistry>,
}

impl CatalogToolProposer {
    pub fn new(
        catalog: WorkflowCatalog,
        classifier: Arc<dyn IntentClassifier>,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            catalog,
            classifier,
            registry,
        }
    }

    fn proposals(&self, role: Role, task_text: &str, intent_hint: Option<&str>) -> Vec<ToolCall> {
        let Some(workflow) = self.catalog.get(role) else {
            return Vec::new();
        };
        let intent_class = intent_hint.map_or_else(
            || self.classifier.classify(role, task_text).intent_class,
            str::to_string,
        );
        workflow
            .templates_for(&intent_class)
            .iter()
            .filter(|template| {
                self.registry
                    .tier_of(&template.router, &template.action)
                    .is_some_and(|tier| tier.is_read())
                    && self.registry.router_allows(&template.router, role)
            })
            .map(|template| {
                ToolCall::new(&template.router, &template.action, template.params.clone())
            })
            .collect()
    }
}

impl ToolCallProposer for CatalogToolProposer {
    fn propose_tool_calls<'a>(
        &'a self,
        role: Role,
        task_text: &'a str,
        intent_hint: Option<&'a str>,
    ) -> ProposalFuture<'a> {
        Box::pin(async move { Ok(self.proposals(role, task_text, intent_hint)) })
    }
}

/// One router call made on the legacy path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub params: Value,
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
    pub gate_id: Option<String>,
}

/// Dispatch `calls` one at a time. A failing or denied call is recorded and
/// the rest still run.
pub(crate) async fn run_sequential_calls(
    registry: &ActionRegistry,
    calls: Vec<ToolCall>,
    ctx: &ToolContext,
) -> Vec<ToolCallRecord> {
    let mut records = Vec::with_capacity(calls.len());
    for call in calls {
        let mut record = ToolCallRecord {
            tool_name: call.tool_name(),
            params: call.params.clone(),
            success: false,
            result: Value::Null,
            error: None,
            gate_id: None,
        };
        match registry.execute_tool(call, ctx).await {
            Ok(ToolOutcome::Completed { result, .. }) => {
                record.success = true;
                record.result = result;
            }
            Ok(ToolOutcome::ApprovalRequired { gate_id, .. }) => {
                record.gate_id = Some(gate_id);
            }
            Err(error) => {
                tracing::warn!(run_id = %ctx.run_id, tool = %record.tool_name, error = %error, "legacy tool call failed");
                record.error = Some(error.to_string());
            }
        }
        records.push(record);
    }
    records
}

pub(crate) fn render_legacy_response(records: &[ToolCallRecord], digest_chars: usize) -> String {
    if records.is_empty() {
        return "No tool calls were needed for this request.".to_string();
    }
    let mut lines = vec!["Results:".to_string()];
    for record in records {
        let line = if record.success {
            format!("- {}: ok :: {}", record.tool_name, digest(&record.result, digest_chars))
        } else if let Some(gate_id) = &record.gate_id {
            format!("- {}: approval_required :: gate {gate_id}", record.tool_name)
        } else {
            format!(
                "- {}: error :: {}",
                record.tool_name,
                record.error.as_deref().unwrap_or("unknown error")
            )
        };
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::demo_registry;
    use crate::ledger::{InMemoryLedger, RunLedger};
    use crate::observability::NoopObserver;
    use crate::planner::KeywordIntentClassifier;
    use serde_json::json;

    #[test]
    fn legacy_response_lists_each_call() {
        let records = vec![
            ToolCallRecord {
                tool_name: "driver_cockpit.find_matches".into(),
                params: json!({}),
                success: true,
                result: json!({"matches": 3}),
                error: None,
                gate_id: None,
            },
            ToolCallRecord {
                tool_name: "driver_cockpit.save_carrier".into(),
                params: json!({}),
                success: false,
                result: Value::Null,
                error: Some("role carrier is not allowed".into()),
                gate_id: None,
            },
        ];
        assert_eq!(
            render_legacy_response(&records, 240),
            "Results:\n- driver_cockpit.find_matches: ok :: {\"matches\":3}\n\
             - driver_cockpit.save_carrier: error :: role carrier is not allowed"
        );
        assert_eq!(
            render_legacy_response(&[], 240),
            "No tool calls were needed for this request."
        );
    }

    #[tokio::test]
    async fn catalog_proposer_offers_only_reads() {
        let ledger: Arc<dyn RunLedger> = Arc::new(InMemoryLedger::new());
        let registry = Arc::new(demo_registry(ledger, Arc::new(NoopObserver)));
        let proposer = CatalogToolProposer::new(
            WorkflowCatalog::standard(),
            Arc::new(KeywordIntentClassifier::standard()),
            registry,
        );

        let calls = proposer
            .propose_tool_calls(
                Role::Recruiter,
                "launch a new campaign",
                Some("campaign_management"),
            )
            .await
            .unwrap();
        let names: Vec<String> = calls.iter().map(ToolCall::tool_name).collect();
        assert_eq!(
            names,
            vec![
                "recruiter_paid_media.get_campaign_performance",
                "recruiter_analytics.get_source_roi",
            ]
        );
    }
}
