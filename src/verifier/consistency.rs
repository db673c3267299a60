use super::{ResponseVerifier, VerificationIssue, VerificationReport, VerifyFuture};
use crate::executor::PlanExecutionReport;
use crate::planner::ExecutionPlan;
use std::collections::BTreeSet;

pub const CONSISTENCY_VERIFIER: &str = "consistency_verifier";

const HEDGE_WORDS: &[&str] = &[
    "partial",
    "unavailable",
    "could not",
    "failed",
    "incomplete",
    "unable",
    "missing",
    "skipped",
];

/// Deterministic cross-check of a draft against the node results.
///
/// Flags a draft that is empty, cites numbers no result contains, reports a
/// failed tool as ok, presents partial data without hedging, or has no
/// successful read to stand on.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyVerifier;

impl ConsistencyVerifier {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        plan: &ExecutionPlan,
        report: &PlanExecutionReport,
        draft: &str,
    ) -> VerificationReport {
        let mut issues = Vec::new();

        if draft.trim().is_empty() {
            issues.push(VerificationIssue::new("empty_response", "draft response is empty"));
            return VerificationReport::from_issues(CONSISTENCY_VERIFIER, issues);
        }

        issues.extend(unsupported_numbers(report, draft));
        issues.extend(failures_reported_as_ok(report, draft));
        issues.extend(unhedged_partial_data(plan, report, draft));

        let planned_reads = plan.nodes().iter().filter(|node| node.is_read()).count();
        if planned_reads > 0 && report.executed_nodes.is_empty() {
            issues.push(VerificationIssue::new(
                "no_supporting_results",
                format!("none of {planned_reads} planned reads returned data"),
            ));
        }

        VerificationReport::from_issues(CONSISTENCY_VERIFIER, issues)
    }
}

/// Every multi-digit figure in the draft must appear in some node output.
fn unsupported_numbers(report: &PlanExecutionReport, draft: &str) -> Vec<VerificationIssue> {
    let evidence: String = report
        .results
        .iter()
        .flat_map(|result| {
            [
                result.result.to_string(),
                result.error.clone().unwrap_or_default(),
                result.gate_id.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>()
        .join("\n");

    numeric_tokens(draft)
        .into_iter()
        .filter(|token| token.chars().filter(char::is_ascii_digit).count() > 1)
        .filter(|token| !evidence.contains(token.as_str()))
        .map(|token| {
            VerificationIssue::new(
                "unsupported_number",
                format!("{token} does not appear in any node result"),
            )
        })
        .collect()
}

fn failures_reported_as_ok(report: &PlanExecutionReport, draft: &str) -> Vec<VerificationIssue> {
    let succeeded: BTreeSet<&str> = report
        .results
        .iter()
        .filter(|result| result.success)
        .map(|result| result.tool_name.as_str())
        .collect();

    report
        .results
        .iter()
        .filter(|result| !result.success && !result.awaiting_approval())
        .filter(|result| !succeeded.contains(result.tool_name.as_str()))
        .filter(|result| draft.contains(&format!("{}: ok", result.tool_name)))
        .map(|result| {
            VerificationIssue::new(
                "failure_reported_as_success",
                format!("{} failed but the draft reports it as ok", result.tool_name),
            )
            .at_node(&result.node_id)
        })
        .collect()
}

fn unhedged_partial_data(
    plan: &ExecutionPlan,
    report: &PlanExecutionReport,
    draft: &str,
) -> Option<VerificationIssue> {
    let missing: Vec<&str> = plan
        .nodes()
        .iter()
        .filter(|node| node.verifier_required)
        .filter(|node| {
            report.failed_nodes.contains(&node.node_id)
                || report.skipped_nodes.iter().any(|s| s.node_id == node.node_id)
        })
        .map(|node| node.node_id.as_str())
        .collect();
    if missing.is_empty() {
        return None;
    }

    let lowered = draft.to_lowercase();
    if HEDGE_WORDS.iter().any(|word| lowered.contains(word)) {
        return None;
    }
    Some(VerificationIssue::new(
        "unhedged_partial_data",
        format!(
            "draft presents complete findings but {} produced no data",
            missing.join(", ")
        ),
    ))
}

/// Standalone numbers: digit runs not glued to letters or underscores, so
/// identifiers like `n2` or `gate_91ab` are not treated as figures.
fn numeric_tokens(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        let glued = index > 0 && is_word_char(chars[index - 1]);
        if !chars[index].is_ascii_digit() || glued {
            index += 1;
            continue;
        }

        let start = index;
        while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.') {
            index += 1;
        }
        if index < chars.len() && is_word_char(chars[index]) {
            while index < chars.len() && is_word_char(chars[index]) {
                index += 1;
            }
            continue;
        }
        let token: String = chars[start..index].iter().collect();
        tokens.push(token.trim_end_matches('.').to_string());
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl ResponseVerifier for ConsistencyVerifier {
    fn name(&self) -> &str {
        CONSISTENCY_VERIFIER
    }

    fn verify_planned_response<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        report: &'a PlanExecutionReport,
        draft: &'a str,
    ) -> VerifyFuture<'a> {
        Box::pin(async move {
            let verdict = self.check(plan, report, draft);
            tracing::debug!(
                plan_id = %plan.plan_id(),
                status = %verdict.status,
                issues = verdict.issues.len(),
                "consistency check finished"
            );
            verdict
        })
    }
}
