//! Turn handling: feature gate, planning, execution, synthesis and
//! verification for one user turn, with the legacy sequential path as the
//! fallback.

mod catalog;
mod legacy;
mod synthesis;
mod turn;

pub use catalog::demo_registry;
pub use legacy::{CatalogToolProposer, ProposalFuture, ToolCallProposer, ToolCallRecord};
pub use synthesis::{DigestSynthesizer, ResponseSynthesizer, SynthesisFuture};
pub use turn::{ExecutionPath, PendingApproval, TurnContext, TurnHandler, TurnOutcome};
