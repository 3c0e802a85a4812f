//! Tool modules for the AgriSight agent.

pub mod base;
pub mod registry;
pub mod weather;
pub mod web;

use std::sync::Arc;

use agrisight_core::config::schema::ToolsConfig;

pub use base::{optional_i64, optional_string, require_string, FnTool, Tool, ToolError};
pub use registry::ToolRegistry;
pub use weather::WeatherTool;
pub use web::WebSearchTool;

/// Registry with the built-in tools.
///
/// `web_search` is only offered when a Brave key is configured.
pub fn builtin_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WeatherTool));
    if !config.web_search.api_key.is_empty() {
        registry.register(Arc::new(WebSearchTool::from_config(&config.web_search)));
    }
    registry
}
