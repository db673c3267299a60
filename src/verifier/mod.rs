//! Post-execution verification of a drafted response against the node
//! results it was derived from. Verification annotates; it never blocks
//! delivery.

mod consistency;

pub use consistency::{CONSISTENCY_VERIFIER, ConsistencyVerifier};

use crate::executor::PlanExecutionReport;
use crate::planner::ExecutionPlan;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Flagged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub code: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl VerificationIssue {
    pub fn new(code: &str, detail: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            detail: detail.into(),
            node_id: None,
        }
    }

    #[must_use]
    pub fn at_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}

impl std::fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node_id {
            Some(node_id) => write!(f, "{} [{node_id}]: {}", self.code, self.detail),
            None => write!(f, "{}: {}", self.code, self.detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    pub verifier_type: String,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationReport {
    /// `verified` when `issues` is empty, `flagged` otherwise.
    pub fn from_issues(verifier_type: impl Into<String>, issues: Vec<VerificationIssue>) -> Self {
        let status = if issues.is_empty() {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Flagged
        };
        Self {
            status,
            verifier_type: verifier_type.into(),
            issues,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    pub fn issue_lines(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = VerificationReport> + Send + 'a>>;

pub trait ResponseVerifier: Send + Sync {
    fn name(&self) -> &str;

    fn verify_planned_response<'a>(
        &'a self,
        plan: &'a ExecutionPlan,
        report: &'a PlanExecutionReport,
        draft: &'a str,
    ) -> VerifyFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_issue_list() {
        assert!(VerificationReport::from_issues(CONSISTENCY_VERIFIER, Vec::new()).is_verified());

        let flagged = VerificationReport::from_issues(
            CONSISTENCY_VERIFIER,
            vec![VerificationIssue::new("unsupported_number", "42 not in any result").at_node("n2")],
        );
        assert_eq!(flagged.status, VerificationStatus::Flagged);
        assert_eq!(
            flagged.issue_lines(),
            vec!["unsupported_number [n2]: 42 not in any result"]
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_value(VerificationStatus::Flagged).unwrap();
        assert_eq!(json, "flagged");
        assert_eq!(VerificationStatus::Verified.to_string(), "verified");
    }
}
