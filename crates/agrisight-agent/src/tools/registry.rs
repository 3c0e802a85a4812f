//! Tool Registry — name → tool lookup plus schema advertisement.
//!
//! Populated at startup, then shared read-only (`Arc<ToolRegistry>`) by every
//! turn. Schemas are advertised in registration order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use agrisight_core::types::{Arguments, ToolSchema};
use serde_json::Value;
use tracing::{debug, info};

use super::base::{FnTool, Tool, ToolError};

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools in registration order, indexed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced in place and
    /// keeps its position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => {
                debug!(tool = %name, "replaced tool");
                self.tools[pos] = tool;
            }
            None => {
                info!(tool = %name, "registered tool");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Register an async function under `schema.name`.
    pub fn register_fn<F, Fut>(&mut self, schema: ToolSchema, f: F)
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.register(Arc::new(FnTool::new(schema, f)));
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&pos| self.tools[pos].clone())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Schemas of all tools, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Names of all tools, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
