//! Tool execution stage — runs the requests of one assistant message.
//!
//! Every well-formed request yields exactly one tool result message, in
//! request order. Failures are rendered into the result body so the model
//! can see them; nothing here returns an error.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, FutureExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use agrisight_core::types::{Message, ToolInvocationRequest};

use crate::tools::{ToolError, ToolRegistry};

/// Default per-call timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches invocation requests to the registry.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    parallel: bool,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
            parallel: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the calls of one message concurrently. Results keep request order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `requests` and return one tool message per well-formed request.
    pub async fn execute(&self, requests: &[ToolInvocationRequest]) -> Vec<Message> {
        let runnable: Vec<&ToolInvocationRequest> = requests
            .iter()
            .filter(|r| {
                if r.is_well_formed() {
                    true
                } else {
                    warn!(id = %r.id, tool = %r.name, "skipping tool request without id or name");
                    false
                }
            })
            .collect();

        if self.parallel && runnable.len() > 1 {
            debug!(count = runnable.len(), "running tool calls concurrently");
            join_all(runnable.into_iter().map(|r| self.run_one(r))).await
        } else {
            let mut results = Vec::with_capacity(runnable.len());
            for request in runnable {
                results.push(self.run_one(request).await);
            }
            results
        }
    }

    async fn run_one(&self, request: &ToolInvocationRequest) -> Message {
        info!(tool = %request.name, id = %request.id, "executing tool call");

        let body = match self.invoke(request).await {
            Ok(output) => {
                let text = render_output(&output);
                debug!(tool = %request.name, result_len = text.len(), "tool result");
                text
            }
            Err(ToolError::NotFound(name)) => {
                warn!(tool = %name, "model requested an unknown tool");
                format!("Error: Tool '{name}' not found.")
            }
            Err(e) => {
                warn!(tool = %request.name, kind = e.kind(), error = %e, "tool call failed");
                format!(
                    "Error: Failed to execute tool '{}'. Reason: {}.\nDetails: {}",
                    request.name,
                    e.kind(),
                    e
                )
            }
        };

        Message::tool_result(request.id.as_str(), request.name.as_str(), body)
    }

    async fn invoke(&self, request: &ToolInvocationRequest) -> Result<Value, ToolError> {
        let tool = self.registry.lookup(&request.name)?;
        let call = AssertUnwindSafe(tool.execute(request.arguments.clone())).catch_unwind();

        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ToolError::Timeout(self.timeout)),
            Ok(Err(panic)) => Err(ToolError::Panicked(panic_message(panic.as_ref()))),
            Ok(Ok(result)) => result,
        }
    }
}

/// Text the model reads for a tool's output.
pub fn render_output(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
