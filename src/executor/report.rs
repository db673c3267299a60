use crate::tools::UpstreamResult;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of one dispatched plan node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub node_id: String,
    pub branch_id: String,
    pub join_key: String,
    pub tool_name: String,
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
    /// Set when the node opened an approval gate instead of running.
    pub gate_id: Option<String>,
    pub latency_ms: u64,
}

impl NodeResult {
    pub fn awaiting_approval(&self) -> bool {
        self.gate_id.is_some()
    }

    pub fn upstream(&self) -> UpstreamResult {
        UpstreamResult {
            node_id: self.node_id.clone(),
            tool_name: self.tool_name.clone(),
            join_key: self.join_key.clone(),
            success: self.success,
            result: self.result.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    pub node_id: String,
    pub tool_name: String,
    pub reason: String,
}

/// Aggregated outcome of executing (part of) a plan.
///
/// `results` is in completion order. A node appears in at most one of
/// `executed_nodes`, `failed_nodes`, `skipped_nodes`, `deferred_nodes`, or
/// the pending-approval set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanExecutionReport {
    pub plan_id: String,
    pub executed_nodes: Vec<String>,
    pub failed_nodes: Vec<String>,
    pub skipped_nodes: Vec<SkippedNode>,
    /// Nodes left for the sequential phase: non-read nodes and everything
    /// that waits on them.
    pub deferred_nodes: Vec<String>,
    pub results: Vec<NodeResult>,
    pub branch_results: BTreeMap<String, Vec<NodeResult>>,
    pub join_results: BTreeMap<String, Vec<NodeResult>>,
    pub summary_text: String,
}

impl PlanExecutionReport {
    pub fn new(plan_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: NodeResult) {
        self.deferred_nodes.retain(|id| *id != result.node_id);
        if result.success {
            self.executed_nodes.push(result.node_id.clone());
        } else if !result.awaiting_approval() {
            self.failed_nodes.push(result.node_id.clone());
        }
        self.branch_results
            .entry(result.branch_id.clone())
            .or_default()
            .push(result.clone());
        self.join_results
            .entry(result.join_key.clone())
            .or_default()
            .push(result.clone());
        self.results.push(result);
    }

    pub fn skip(&mut self, node_id: &str, tool_name: &str, reason: impl Into<String>) {
        self.deferred_nodes.retain(|id| id != node_id);
        self.skipped_nodes.push(SkippedNode {
            node_id: node_id.to_string(),
            tool_name: tool_name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn result_for(&self, node_id: &str) -> Option<&NodeResult> {
        self.results.iter().find(|result| result.node_id == node_id)
    }

    pub fn succeeded(&self, node_id: &str) -> bool {
        self.result_for(node_id).is_some_and(|result| result.success)
    }

    pub fn pending_approvals(&self) -> impl Iterator<Item = &NodeResult> {
        self.results.iter().filter(|result| result.awaiting_approval())
    }

    /// Some planned data is missing: a node failed or was skipped.
    pub fn is_partial(&self) -> bool {
        !self.failed_nodes.is_empty() || !self.skipped_nodes.is_empty()
    }

    /// Rebuild `summary_text`: one line per result in completion order, then
    /// one line per skipped node.
    pub fn render_summary(&mut self, digest_chars: usize) {
        let mut lines: Vec<String> = self
            .results
            .iter()
            .map(|result| summary_line(result, digest_chars))
            .collect();
        lines.extend(self.skipped_nodes.iter().map(|skipped| {
            format!("- {}: skipped :: {}", skipped.tool_name, skipped.reason)
        }));
        self.summary_text = lines.join("\n");
    }
}

fn summary_line(result: &NodeResult, digest_chars: usize) -> String {
    if result.success {
        return format!(
            "- {}: ok :: {}",
            result.tool_name,
            digest(&result.result, digest_chars)
        );
    }
    if let Some(gate_id) = &result.gate_id {
        return format!(
            "- {}: approval_required :: gate {gate_id}",
            result.tool_name
        );
    }
    format!(
        "- {}: error :: {}",
        result.tool_name,
        result.error.as_deref().unwrap_or("unknown error")
    )
}

/// Compact JSON rendering, cut to `max_chars` characters.
pub fn digest(value: &Value, max_chars: usize) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= max_chars {
        return rendered;
    }
    let mut cut: String = rendered.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(node_id: &str, success: bool) -> NodeResult {
        NodeResult {
            node_id: node_id.into(),
            branch_id: "b1".into(),
            join_key: "admin_diagnostics".into(),
            tool_name: "observability_ops.get_tracing_dashboard".into(),
            success,
            result: if success { json!({"ok": true}) } else { Value::Null },
            error: (!success).then(|| "upstream unavailable".to_string()),
            gate_id: None,
            latency_ms: 4,
        }
    }

    #[test]
    fn summary_lines_follow_completion_order() {
        let mut report = PlanExecutionReport::new("plan_1");
        report.record(result("n2", false));
        report.record(result("n1", true));
        report.skip("n3", "external_api.get_api_usage", "dependency n2 failed");
        report.render_summary(240);

        assert_eq!(
            report.summary_text,
            "- observability_ops.get_tracing_dashboard: error :: upstream unavailable\n\
             - observability_ops.get_tracing_dashboard: ok :: {\"ok\":true}\n\
             - external_api.get_api_usage: skipped :: dependency n2 failed"
        );
        assert_eq!(report.executed_nodes, vec!["n1"]);
        assert_eq!(report.failed_nodes, vec!["n2"]);
        assert!(report.is_partial());
    }

    #[test]
    fn record_clears_deferred_entry() {
        let mut report = PlanExecutionReport::new("plan_1");
        report.deferred_nodes = vec!["n1".into(), "n2".into()];
        report.record(result("n1", true));
        assert_eq!(report.deferred_nodes, vec!["n2"]);
        assert_eq!(report.branch_results["b1"].len(), 1);
        assert_eq!(report.join_results["admin_diagnostics"].len(), 1);
    }

    #[test]
    fn approval_results_are_neither_executed_nor_failed() {
        let mut report = PlanExecutionReport::new("plan_1");
        let mut pending = result("n4", false);
        pending.error = None;
        pending.gate_id = Some("gate_1".into());
        report.record(pending);
        report.render_summary(240);

        assert!(report.executed_nodes.is_empty());
        assert!(report.failed_nodes.is_empty());
        assert_eq!(report.pending_approvals().count(), 1);
        assert!(report.summary_text.ends_with("approval_required :: gate gate_1"));
    }

    #[test]
    fn digest_truncates_on_char_boundary() {
        let value = json!({"note": "ééééééééé"});
        let cut = digest(&value, 12);
        assert_eq!(cut.chars().count(), 13);
        assert!(cut.ends_with('…'));
        assert_eq!(digest(&json!(1), 12), "1");
    }
}
