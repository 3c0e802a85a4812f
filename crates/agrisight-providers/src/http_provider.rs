//! Generic HTTP provider for OpenAI-compatible APIs.
//!
//! Talks directly to any `/chat/completions` endpoint (Nebius AI Studio by
//! default). Failures are classified into [`ProviderError`] so the gateway
//! can turn them into the right notice for the user.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, error, warn};

use crate::error::ProviderError;
use crate::traits::LlmProvider;
use crate::wire::{ChatCompletionRequest, ChatCompletionResponse};

/// Longest error body kept in a [`ProviderError`].
const MAX_ERROR_BODY: usize = 500;

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Connection settings for one endpoint.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    /// API base URL (e.g. `"https://api.studio.nebius.com/v1/"`).
    pub api_base: String,
    /// API key for Bearer authentication.
    pub api_key: String,
    /// Extra headers to send with each request.
    pub extra_headers: Option<HashMap<String, String>>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Name used in logs.
    pub display_name: String,
}

impl ProviderSettings {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        ProviderSettings {
            api_base: api_base.into(),
            api_key: api_key.into(),
            extra_headers: None,
            timeout: Duration::from_secs(60),
            display_name: "Nebius".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// An LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    extra_headers: HeaderMap,
    timeout: Duration,
    display_name: String,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("provider", &self.display_name)
            .finish()
    }
}

impl HttpProvider {
    /// Create a new HttpProvider.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = settings.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!("Invalid header: {}={}", key, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpProvider {
            client,
            api_base: settings.api_base.clone(),
            api_key: settings.api_key.clone(),
            extra_headers,
            timeout: settings.timeout,
            display_name: settings.display_name.clone(),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_reqwest(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify_reqwest(e))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        if parsed.choices.is_empty() {
            return Err(ProviderError::Decode("no choices in response".to_string()));
        }
        Ok(parsed)
    }

    fn classify_reqwest(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        debug!(
            provider = %self.display_name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, |t| t.len()),
            "Calling LLM"
        );

        let result = self.send(request).await;

        match &result {
            Ok(resp) => {
                let message = resp.first_message();
                debug!(
                    provider = %self.display_name,
                    has_content = message.is_some_and(|m| m.content.is_some()),
                    tool_calls = message.and_then(|m| m.tool_calls.as_ref()).map_or(0, |c| c.len()),
                    "LLM response received"
                );
            }
            Err(e) => {
                error!(provider = %self.display_name, kind = e.kind(), error = %e, "LLM call failed");
            }
        }
        result
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Map a non-success status to an error, pulling a readable detail out of
/// the body when the backend sent JSON.
fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let code = status.as_u16();
    if matches!(code, 400 | 422) {
        ProviderError::Rejected {
            status: code,
            detail: extract_detail(body),
        }
    } else {
        ProviderError::Status {
            status: code,
            body: truncate(body),
        }
    }
}

/// Look for `detail` (FastAPI style) or `error.message` (OpenAI style).
fn extract_detail(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return truncate(body);
    };

    let detail = json
        .get("detail")
        .or_else(|| json.get("error").and_then(|e| e.get("message")))
        .or_else(|| json.get("message"));

    match detail {
        Some(serde_json::Value::String(s)) => truncate(s),
        Some(other) => truncate(&other.to_string()),
        None => truncate(body),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_ERROR_BODY {
        s.to_string()
    } else {
        let cut: String = s.chars().take(MAX_ERROR_BODY).collect();
        format!("{cut}...")
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{ToolDefinition, WireMessage};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_provider(api_base: &str) -> HttpProvider {
        HttpProvider::new(&ProviderSettings::new(api_base, "test-key-123")).unwrap()
    }

    fn make_request(model: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                WireMessage::system("You are AgriSight Bot."),
                WireMessage::user("Hello"),
            ],
            tools: None,
            tool_choice: None,
            temperature: 0.6,
            max_tokens: None,
        }
    }

    // ── Unit tests ──

    #[test]
    fn test_completions_url_trailing_slash() {
        let provider = make_provider("https://api.studio.nebius.com/v1/");
        assert_eq!(
            provider.completions_url(),
            "https://api.studio.nebius.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_completions_url_no_trailing_slash() {
        let provider = make_provider("https://api.studio.nebius.com/v1");
        assert_eq!(
            provider.completions_url(),
            "https://api.studio.nebius.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_extra_headers() {
        let mut settings = ProviderSettings::new("https://example.com/v1", "key");
        settings.extra_headers = Some(HashMap::from([
            ("X-Team".to_string(), "agri".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]));
        let provider = HttpProvider::new(&settings).unwrap();
        assert!(provider.extra_headers.contains_key("x-team"));
        assert_eq!(provider.extra_headers.len(), 1);
    }

    #[test]
    fn test_extract_detail_variants() {
        assert_eq!(extract_detail(r#"{"detail": "image too large"}"#), "image too large");
        assert_eq!(
            extract_detail(r#"{"error": {"message": "tools not supported"}}"#),
            "tools not supported"
        );
        assert_eq!(
            extract_detail(r#"{"detail": [{"loc": ["body"], "msg": "bad"}]}"#),
            r#"[{"loc":["body"],"msg":"bad"}]"#
        );
        assert_eq!(extract_detail("plain text"), "plain text");
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(&body).chars().count(), MAX_ERROR_BODY + 3);
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "message": {"content": "Hello! I'm AgriSight Bot.", "tool_calls": null},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let resp = provider.complete(&make_request("llama")).await.unwrap();

        let message = resp.first_message().unwrap();
        assert_eq!(message.content.as_deref(), Some("Hello! I'm AgriSight Bot."));
        assert!(message.tool_calls.is_none());
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_complete_partial_usage() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "Hello!"}}],
                "usage": {"prompt_tokens": 10, "total_tokens": 10}
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let resp = provider.complete(&make_request("llama")).await.unwrap();

        assert_eq!(resp.first_message().unwrap().content.as_deref(), Some("Hello!"));
        let usage = resp.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[tokio::test]
    async fn test_complete_with_tool_calls() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc123",
                            "type": "function",
                            "function": {
                                "name": "get_current_weather",
                                "arguments": "{\"location\": \"Jakarta\"}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let mut request = make_request("llama");
        request.tools = Some(vec![ToolDefinition::new(
            "get_current_weather",
            "Get the weather",
            serde_json::json!({"type": "object"}),
        )]);
        request.tool_choice = Some("auto".into());

        let resp = provider.complete(&request).await.unwrap();
        let calls = resp.first_message().unwrap().tool_calls.clone().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_deref(), Some("call_abc123"));
        assert_eq!(calls[0].name(), Some("get_current_weather"));
    }

    #[tokio::test]
    async fn test_complete_sends_correct_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "google/gemma-3-27b-it-fast",
                "temperature": 0.6
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ok"}, "finish_reason": "stop"}]
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let resp = provider
            .complete(&make_request("google/gemma-3-27b-it-fast"))
            .await
            .unwrap();

        // If the body matcher fails, wiremock returns 404 → we'd get an error
        assert_eq!(resp.first_message().unwrap().content.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_complete_rejected_400() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "Image format not supported"
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider.complete(&make_request("gemma")).await.unwrap_err();

        match err {
            ProviderError::Rejected { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Image format not supported");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_rejected_422() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error": {"message": "tool_choice requires tools"}
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider.complete(&make_request("llama")).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.detail(), "tool_choice requires tools");
    }

    #[tokio::test]
    async fn test_complete_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider.complete(&make_request("llama")).await.unwrap_err();

        assert!(!err.is_rejection());
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
        assert!(err.to_string().contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_complete_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let settings = ProviderSettings::new(mock_server.uri(), "key")
            .with_timeout(Duration::from_millis(200));
        let provider = HttpProvider::new(&settings).unwrap();
        let err = provider.complete(&make_request("llama")).await.unwrap_err();

        assert!(matches!(err, ProviderError::Timeout(_)));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_complete_network_error() {
        // Point to a port that's not listening
        let provider = make_provider("http://127.0.0.1:1");
        let err = provider.complete(&make_request("llama")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_complete_garbage_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider.complete(&make_request("llama")).await.unwrap_err();
        assert_eq!(err.kind(), "Decode");
    }

    #[tokio::test]
    async fn test_complete_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri());
        let err = provider.complete(&make_request("llama")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
