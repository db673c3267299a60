use crate::executor::PlanExecutionReport;
use crate::planner::ExecutionPlan;
use std::future::Future;
use std::pin::Pin;

pub type SynthesisFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

const PARTIAL_NOTICE: &str = "Some data was unavailable: partial results only.";

/// Turns executed plan results into the draft answer shown to the user.
pub trait ResponseSynthesizer: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        task_text: &'a str,
        plan: &'a ExecutionPlan,
        report: &'a PlanExecutionReport,
    ) -> SynthesisFuture<'a>;
}

/// Renders the executor summary as the draft. Adds a hedge line when part
/// of the plan produced no data, and lists calls waiting on approval.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestSynthesizer;

impl DigestSynthesizer {
    pub fn render(plan: &ExecutionPlan, report: &PlanExecutionReport) -> String {
        let mut draft = format!("Findings for {}:", plan.workflow_type());
        if report.summary_text.is_empty() {
            draft.push_str("\nNo planned data was returned.");
        } else {
            draft.push('\n');
            draft.push_str(&report.summary_text);
        }

        let waiting: Vec<&str> = report
            .pending_approvals()
            .map(|result| result.tool_name.as_str())
            .collect();
        if !waiting.is_empty() {
            draft.push_str("\nAwaiting approval before running: ");
            draft.push_str(&waiting.join(", "));
        }
        if report.is_partial() {
            draft.push('\n');
            draft.push_str(PARTIAL_NOTICE);
        }
        draft
    }
}

impl ResponseSynthesizer for DigestSynthesizer {
    fn synthesize<'a>(
        &'a self,
        _task_text: &'a str,
        plan: &'a ExecutionPlan,
        report: &'a PlanExecutionReport,
    ) -> SynthesisFuture<'a> {
        Box::pin(async move { Ok(Self::render(plan, report)) })
    }
}
