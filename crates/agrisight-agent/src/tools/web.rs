//! Web search tool (Brave Search API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use agrisight_core::config::schema::WebSearchConfig;
use agrisight_core::types::Arguments;

use super::base::{optional_i64, require_string, Tool, ToolError};

/// User-Agent header.
const USER_AGENT: &str = concat!("agrisight/", env!("CARGO_PKG_VERSION"));

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

// ─────────────────────────────────────────────
// WebSearchTool (Brave API)
// ─────────────────────────────────────────────

/// Searches the web using the Brave Search API.
pub struct WebSearchTool {
    api_key: String,
    max_results: u32,
    endpoint: String,
    client: Client,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>, max_results: u32) -> Self {
        Self {
            api_key: api_key.into(),
            max_results: max_results.clamp(1, 10),
            endpoint: BRAVE_ENDPOINT.to_string(),
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &WebSearchConfig) -> Self {
        Self::new(config.api_key.clone(), config.max_results)
    }

    /// Point the tool at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information such as crop prices, pest outbreaks, or \
         agricultural news. Returns a numbered list of results with titles, URLs, and descriptions."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "count": {
                    "type": "integer",
                    "description": "Number of results (1-10)",
                    "minimum": 1,
                    "maximum": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let query = require_string(&args, "query")?;
        let count = optional_i64(&args, "count")
            .unwrap_or(i64::from(self.max_results))
            .clamp(1, 10);

        if self.api_key.is_empty() {
            return Err(ToolError::Upstream(
                "no Brave API key configured (set BRAVE_API_KEY)".into(),
            ));
        }

        debug!(query = %query, count, "searching web");
        let count = count.to_string();

        let resp = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query.as_str()), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| ToolError::Upstream(format!("Brave API request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::Upstream(format!("Brave API returned {status}: {body}")));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("failed to parse Brave response: {e}")))?;

        Ok(Value::String(format_results(&body)))
    }
}

fn format_results(body: &Value) -> String {
    let results = body["web"]["results"].as_array().cloned().unwrap_or_default();
    if results.is_empty() {
        return "No results found.".into();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let title = r["title"].as_str().unwrap_or("(no title)");
            let url = r["url"].as_str().unwrap_or("");
            let desc = r["description"].as_str().unwrap_or("");
            format!("{}. {}\n   {}\n   {}", i + 1, title, url, desc)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
