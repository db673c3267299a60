pub mod builder;
pub mod graph;
pub mod intent;
pub mod types;
pub mod workflows;

pub use builder::{ExecutionPlanner, PlanBuilder, PlanFuture, PlanningContext};
pub use graph::PlanGraph;
pub use intent::{GENERAL_INQUIRY, Intent, IntentClassifier, KeywordIntentClassifier};
pub use types::{ExecutionModel, ExecutionPlan, NodeKind, PlanNode, PlanSummary};
pub use workflows::{NodeTemplate, WorkflowCatalog, WorkflowDefinition};
