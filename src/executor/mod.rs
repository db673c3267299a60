//! Plan execution: branch-parallel reads, then sequential mutations.

mod dag;
mod node;
pub mod report;
mod sequential;

pub use dag::{DagExecutor, ExecutionFuture, PlanExecutor};
pub use node::NodeRunner;
pub use report::{NodeResult, PlanExecutionReport, SkippedNode, digest};
pub use sequential::SequentialDispatcher;
