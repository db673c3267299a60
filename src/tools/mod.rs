pub mod middleware;
pub mod registry;
pub mod traits;
pub mod types;

pub use middleware::{AuditMiddleware, ResultSizeLimitMiddleware, default_middleware_stack};
pub use registry::{ActionRegistry, RouterDefinition};
pub use traits::{
    ActionHandler, FnHandler, HandlerFuture, MiddlewareDecision, StaticHandler, ToolContext,
    ToolMiddleware,
};
pub use types::{
    ActionSpec, ExecutionMode, NodeBinding, RouterSpec, Tier, ToolCall, ToolOutcome,
    UpstreamResult, tool_name,
};
