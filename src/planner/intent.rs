//! Intent classification: maps a task text to one of a role's intent classes.

use crate::rollout::Role;
use serde::Serialize;
use std::collections::HashMap;

pub const GENERAL_INQUIRY: &str = "general_inquiry";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub intent_class: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
}

impl Intent {
    pub fn general() -> Self {
        Self {
            intent_class: GENERAL_INQUIRY.to_string(),
            confidence: 0.0,
            matched_keywords: Vec::new(),
        }
    }
}

pub trait IntentClassifier: Send + Sync {
    fn classify(&self, role: Role, task_text: &str) -> Intent;
}

struct IntentRule {
    intent_class: &'static str,
    keywords: &'static [&'static str],
}

/// Keyword-scoring classifier. The rule with the most keyword hits wins;
/// ties go to the rule listed first. No hits yields `general_inquiry`.
pub struct KeywordIntentClassifier {
    rules: HashMap<Role, Vec<IntentRule>>,
}

const fn rule(intent_class: &'static str, keywords: &'static [&'static str]) -> IntentRule {
    IntentRule {
        intent_class,
        keywords,
    }
}

impl KeywordIntentClassifier {
    pub fn standard() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            Role::Admin,
            vec![
                rule(
                    "system_health",
                    &["health", "status", "uptime", "latency", "error rate", "outage", "dashboard"],
                ),
                rule(
                    "anomaly_investigation",
                    &["anomaly", "spike", "investigate", "incident", "unusual", "drop"],
                ),
                rule(
                    "ai_performance",
                    &["scoring", "accuracy", "model", "recalibrate", "tool performance"],
                ),
                rule("data_analysis", &["trend", "analysis", "analyze", "benchmark", "report"]),
                rule("operational_query", &["usage", "queue", "volume", "api key", "quota"]),
            ],
        );
        rules.insert(
            Role::Recruiter,
            vec![
                rule(
                    "campaign_management",
                    &["campaign", "ad set", "ads", "budget", "creative"],
                ),
                rule("pipeline_analysis", &["pipeline", "stale", "funnel", "stage", "drop-off"]),
                rule("driver_search", &["find drivers", "search", "candidates near", "cdl-a"]),
                rule(
                    "candidate_intel",
                    &["candidate", "driver profile", "background", "experience", "assess"],
                ),
                rule("outreach_help", &["outreach", "message", "email", "sms", "follow up"]),
                rule("market_analysis", &["market", "pay rate", "benchmark", "competitor"]),
                rule("compliance_check", &["compliance", "fmcsa", "violation", "mvr"]),
                rule("onboarding_help", &["onboard", "orientation", "paperwork"]),
            ],
        );
        rules.insert(
            Role::Carrier,
            vec![
                rule(
                    "driver_acquisition",
                    &["hire", "hiring", "recruit", "applicants", "driver acquisition"],
                ),
                rule(
                    "market_benchmarking",
                    &["benchmark", "market", "compare", "pay", "competitor"],
                ),
                rule("compliance_ops", &["compliance", "safety", "inspection", "csa", "fmcsa"]),
                rule("profile_management", &["profile", "listing", "company page"]),
            ],
        );
        rules.insert(
            Role::Driver,
            vec![
                rule(
                    "compensation_discovery",
                    &["pay", "salary", "cpm", "per mile", "compensation"],
                ),
                rule(
                    "carrier_intel_request",
                    &["review", "reputation", "tell me about", "is it good", "turnover"],
                ),
                rule("carrier_discovery", &["find carrier", "carriers", "companies", "hiring"]),
                rule("market_research", &["market", "demand", "region", "lane"]),
                rule(
                    "compliance_question",
                    &["hours of service", "hos", "medical card", "compliance"],
                ),
            ],
        );
        Self { rules }
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, role: Role, task_text: &str) -> Intent {
        let text = task_text.to_lowercase();
        let Some(rules) = self.rules.get(&role) else {
            return Intent::general();
        };

        let mut best: Option<(&IntentRule, Vec<String>)> = None;
        for rule in rules {
            let hits: Vec<String> = rule
                .keywords
                .iter()
                .filter(|keyword| text.contains(**keyword))
                .map(|keyword| (*keyword).to_string())
                .collect();
            let better = match &best {
                Some((_, best_hits)) => hits.len() > best_hits.len(),
                None => !hits.is_empty(),
            };
            if better {
                best = Some((rule, hits));
            }
        }

        match best {
            Some((rule, hits)) => {
                #[allow(clippy::cast_precision_loss)]
                let confidence = (hits.len() as f64 / 3.0).min(1.0);
                Intent {
                    intent_class: rule.intent_class.to_string(),
                    confidence,
                    matched_keywords: hits,
                }
            }
            None => Intent::general(),
        }
    }
}
