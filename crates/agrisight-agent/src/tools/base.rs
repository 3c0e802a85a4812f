//! Tool trait — the interface every agent tool implements.
//!
//! Tools take keyword-style [`Arguments`] and return a JSON value: a string
//! for plain text, anything else for structured output. The execution stage
//! turns that value into the text the model reads.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use thiserror::Error;

use agrisight_core::types::{Arguments, ToolSchema};

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// Why a tool call did not produce output.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A service the tool depends on failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    /// Short class name shown in error results.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "NotFound",
            ToolError::InvalidArguments(_) => "InvalidArguments",
            ToolError::Upstream(_) => "UpstreamError",
            ToolError::Timeout(_) => "Timeout",
            ToolError::Panicked(_) => "Panic",
            ToolError::Other(_) => "Error",
        }
    }
}

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The registry advertises `schema()` to the model and the execution stage
/// dispatches calls to `execute()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the model to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object:
    /// `{"type": "object", "properties": {...}, "required": [...]}`.
    fn parameters(&self) -> Value;

    /// Run the tool.
    async fn execute(&self, args: Arguments) -> Result<Value, ToolError>;

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────
// Closure adapter
// ─────────────────────────────────────────────

type Handler = Box<dyn Fn(Arguments) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// Wraps an async function as a [`Tool`].
///
/// ```
/// use agrisight_agent::tools::FnTool;
/// use agrisight_core::types::ToolSchema;
/// use serde_json::{json, Value};
///
/// let tool = FnTool::new(
///     ToolSchema::new("ping", "Replies with pong", json!({"type": "object", "properties": {}})),
///     |_args| async { Ok(Value::from("pong")) },
/// );
/// ```
pub struct FnTool {
    schema: ToolSchema,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Fut>(schema: ToolSchema, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        FnTool {
            schema,
            handler: Box::new(move |args| f(args).boxed()),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn description(&self) -> &str {
        &self.schema.description
    }

    fn parameters(&self) -> Value {
        self.schema.parameters.clone()
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        (self.handler)(args).await
    }

    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required string argument.
pub fn require_string(args: &Arguments, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required parameter: {key}")))
}

/// Extract an optional string argument.
pub fn optional_string(args: &Arguments, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Extract an optional integer argument. Accepts numeric strings, which
/// some models emit for integer fields.
pub fn optional_i64(args: &Arguments, key: &str) -> Option<i64> {
    match args.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        v => v.as_i64(),
    }
}
