//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `BackendConfig`, `ToolsConfig`,
//! `SessionsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.agrisight/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub backend: BackendConfig,
    pub tools: ToolsConfig,
    pub sessions: SessionsConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Control loop and history settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Assistant name used in the directive.
    pub name: String,
    /// Replaces the built-in directive text when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
    /// Maximum model calls per user turn.
    pub max_rounds: usize,
    /// Maximum messages kept per conversation, directive included.
    pub history_limit: usize,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum tokens to generate per reply. Backend default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Timeout for a single tool call, in seconds.
    pub tool_timeout_secs: u64,
    /// Run the tool calls of one reply concurrently.
    pub parallel_tools: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "AgriSight Bot".to_string(),
            directive: None,
            max_rounds: 8,
            history_limit: 10,
            temperature: 0.6,
            max_tokens: None,
            tool_timeout_secs: 30,
            parallel_tools: false,
        }
    }
}

// ─────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────

/// OpenAI-compatible endpoint serving both the text and the vision model.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    /// API key for Bearer authentication.
    pub api_key: String,
    /// Chat completions base URL.
    pub api_base: String,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
    /// Tool-capable text model.
    pub text_model: String,
    /// Vision model (no tool calling).
    pub vision_model: String,
    /// Timeout for a single completion request, in seconds.
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.studio.nebius.com/v1/".to_string(),
            extra_headers: None,
            text_model: "meta-llama/Meta-Llama-3.1-70B-Instruct-fast".to_string(),
            vision_model: "google/gemma-3-27b-it-fast".to_string(),
            request_timeout_secs: 60,
        }
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Tool configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub web_search: WebSearchConfig,
}

/// Web search configuration (Brave API).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSearchConfig {
    /// Brave Search API key.
    #[serde(default)]
    pub api_key: String,
    /// Maximum number of search results to return.
    pub max_results: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: 5,
        }
    }
}

// ─────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────

/// Session store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionsConfig {
    /// Write sessions to JSONL files after each turn.
    pub persist: bool,
    /// Sessions directory. Defaults to `~/.agrisight/sessions`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            persist: true,
            dir: None,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
