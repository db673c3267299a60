pub use super::traits::{MiddlewareDecision, ToolContext, ToolMiddleware};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// ── AuditMiddleware ─────────────────────────────────────────────────

#[derive(Debug)]
pub struct AuditMiddleware;

impl ToolMiddleware for AuditMiddleware {
    fn before_execute<'a>(
        &'a self,
        tool_name: &'a str,
        _params: &'a Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<MiddlewareDecision>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                tool = tool_name,
                run_id = %ctx.run_id,
                role = %ctx.role,
                node_id = ctx.node.as_ref().map(|node| node.node_id.as_str()),
                "tool execution started"
            );
            Ok(MiddlewareDecision::Continue)
        })
    }

    fn after_execute<'a>(
        &'a self,
        tool_name: &'a str,
        result: &'a mut Value,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                tool = tool_name,
                run_id = %ctx.run_id,
                role = %ctx.role,
                is_null = result.is_null(),
                "tool execution finished"
            );
        })
    }
}

// ── ResultSizeLimitMiddleware ───────────────────────────────────────

/// Replaces oversized handler payloads with a truncated string preview.
#[derive(Debug)]
pub struct ResultSizeLimitMiddleware {
    max_bytes: usize,
}

const MAX_RESULT_BYTES: usize = 65_536;

impl ResultSizeLimitMiddleware {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for ResultSizeLimitMiddleware {
    fn default() -> Self {
        Self::new(MAX_RESULT_BYTES)
    }
}

fn truncate_to_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

impl ToolMiddleware for ResultSizeLimitMiddleware {
    fn before_execute<'a>(
        &'a self,
        _tool_name: &'a str,
        _params: &'a Value,
        _ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<MiddlewareDecision>> + Send + 'a>> {
        Box::pin(async move { Ok(MiddlewareDecision::Continue) })
    }

    fn after_execute<'a>(
        &'a self,
        tool_name: &'a str,
        result: &'a mut Value,
        _ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let serialized = result.to_string();
            if serialized.len() <= self.max_bytes {
                return;
            }
            tracing::warn!(
                tool = tool_name,
                bytes = serialized.len(),
                limit = self.max_bytes,
                "tool result truncated"
            );
            *result = serde_json::json!({
                "truncated": true,
                "original_bytes": serialized.len(),
                "preview": truncate_to_char_boundary(&serialized, self.max_bytes),
            });
        })
    }
}

pub fn default_middleware_stack() -> Vec<Arc<dyn ToolMiddleware>> {
    vec![
        Arc::new(AuditMiddleware),
        Arc::new(ResultSizeLimitMiddleware::default()),
    ]
}
