//! Model gateway — one `complete` call in front of the text and vision backends.
//!
//! Translates the conversation into the chat-completions wire format, picks
//! the model for the turn, and turns the reply (or the failure) back into an
//! assistant [`Message`]. Nothing here returns an error: every failure
//! becomes a terminal assistant message so the control loop always ends.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use agrisight_core::types::{Arguments, ImagePayload, Message, ToolInvocationRequest, ToolSchema};
use agrisight_providers::wire::{ResponseMessage, WireToolCall};
use agrisight_providers::{
    ChatCompletionRequest, ChatCompletionResponse, LlmProvider, ProviderError, ToolDefinition,
    WireMessage,
};

use crate::executor::panic_message;

/// Text of the user message synthesised when an image arrives without one.
pub const IMAGE_PROMPT: &str = "Please analyze this image.";

/// Reply used when there is nothing to send.
pub const EMPTY_HISTORY_NOTICE: &str = "Internal Error: No history to process.";

// ─────────────────────────────────────────────
// Backend selection
// ─────────────────────────────────────────────

/// Which backend serves a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Tool-capable text model.
    Text,
    /// Vision model; no tool calling.
    Vision,
}

/// The model and tool policy for one model call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSelection {
    pub backend: Backend,
    pub model: String,
    pub tools_enabled: bool,
}

impl BackendSelection {
    /// Vision without tools when the turn carries an image, text with tools otherwise.
    pub fn for_input(has_image: bool, text_model: &str, vision_model: &str) -> Self {
        if has_image {
            BackendSelection {
                backend: Backend::Vision,
                model: vision_model.to_string(),
                tools_enabled: false,
            }
        } else {
            BackendSelection {
                backend: Backend::Text,
                model: text_model.to_string(),
                tools_enabled: true,
            }
        }
    }
}

// ─────────────────────────────────────────────
// ModelGateway
// ─────────────────────────────────────────────

/// Sends the conversation to the selected backend.
pub struct ModelGateway {
    provider: Arc<dyn LlmProvider>,
    text_model: String,
    vision_model: String,
    tools: Vec<ToolDefinition>,
    temperature: f64,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ModelGateway {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        text_model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            text_model: text_model.into(),
            vision_model: vision_model.into(),
            tools: Vec::new(),
            temperature: 0.6,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Advertise these tools on text-backend calls.
    pub fn with_tools(mut self, schemas: Vec<ToolSchema>) -> Self {
        self.tools = schemas
            .into_iter()
            .map(|s| ToolDefinition::new(s.name, s.description, s.parameters))
            .collect();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Upper bound on a single backend call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pick the backend for a turn.
    pub fn select(&self, has_image: bool) -> BackendSelection {
        BackendSelection::for_input(has_image, &self.text_model, &self.vision_model)
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    /// Run one model call and return the assistant reply.
    pub async fn complete(
        &self,
        history: &[Message],
        selection: &BackendSelection,
        image: Option<&ImagePayload>,
    ) -> Message {
        let messages = format_messages(history, image);
        if messages.is_empty() {
            error!("no messages left to send after formatting");
            return Message::assistant(EMPTY_HISTORY_NOTICE);
        }

        let advertise = selection.tools_enabled && !self.tools.is_empty();
        let request = ChatCompletionRequest {
            model: selection.model.clone(),
            messages,
            tools: advertise.then(|| self.tools.clone()),
            tool_choice: advertise.then(|| "auto".to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            backend = ?selection.backend,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "calling model"
        );

        let call = AssertUnwindSafe(self.provider.complete(&request)).catch_unwind();
        let result = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
            Ok(Err(panic)) => {
                error!(panic = %panic_message(panic.as_ref()), "model call panicked");
                return generic_failure("Panic");
            }
            Ok(Ok(result)) => result,
        };

        match result {
            Ok(response) => parse_reply(&response),
            Err(e) => {
                error!(kind = e.kind(), error = %e, "model call failed");
                failure_message(&e)
            }
        }
    }
}

// ─────────────────────────────────────────────
// Formatting
// ─────────────────────────────────────────────

/// Translate history into wire messages, attaching `image` to the most
/// recent user message.
///
/// Empty directives, blank user text (unless it carries the image), and
/// assistant messages with neither text nor requests are dropped.
pub fn format_messages(history: &[Message], image: Option<&ImagePayload>) -> Vec<WireMessage> {
    let image_url = image.map(data_uri);
    let image_target = image_url.as_ref().and_then(|_| {
        history
            .iter()
            .rposition(|m| matches!(m, Message::User { .. }))
    });

    let mut out = Vec::with_capacity(history.len() + 1);
    for (index, message) in history.iter().enumerate() {
        match message {
            Message::System { content } => {
                if !content.trim().is_empty() {
                    out.push(WireMessage::system(content.as_str()));
                }
            }
            Message::User { content, .. } => match (&image_url, image_target == Some(index)) {
                (Some(url), true) => {
                    let text = if content.trim().is_empty() { IMAGE_PROMPT } else { content.as_str() };
                    out.push(WireMessage::user_with_image(text, url.as_str()));
                }
                _ if !content.trim().is_empty() => out.push(WireMessage::user(content.as_str())),
                _ => {}
            },
            Message::Assistant { content, tool_calls } => {
                let text = content.clone().filter(|t| !t.is_empty());
                let calls: Vec<WireToolCall> = tool_calls
                    .iter()
                    .map(|r| {
                        let args = Value::Object(r.arguments.clone()).to_string();
                        WireToolCall::function(r.id.as_str(), r.name.as_str(), args)
                    })
                    .collect();
                if text.is_some() || !calls.is_empty() {
                    out.push(WireMessage::assistant(text, calls));
                }
            }
            Message::Tool {
                tool_call_id,
                name,
                content,
            } => out.push(WireMessage::tool(tool_call_id.as_str(), name.as_str(), content.as_str())),
        }
    }

    if let (Some(url), None) = (image_url, image_target) {
        debug!("no user message to carry the image, synthesising one");
        out.push(WireMessage::user_with_image(IMAGE_PROMPT, url));
    }

    out
}

/// Encode an image as a `data:` URI.
pub fn data_uri(image: &ImagePayload) -> String {
    format!("data:{};base64,{}", image.mime_type, STANDARD.encode(&image.bytes))
}

// ─────────────────────────────────────────────
// Reply parsing
// ─────────────────────────────────────────────

/// Turn the first choice of a response into an assistant message.
///
/// Tool calls without an id or a name, or whose arguments don't decode to
/// a JSON object, are dropped with a warning. The rest of the reply is kept.
pub fn parse_reply(response: &ChatCompletionResponse) -> Message {
    let Some(reply) = response.first_message() else {
        warn!("response had no choices");
        return Message::assistant("");
    };
    parse_message(reply)
}

fn parse_message(reply: &ResponseMessage) -> Message {
    let text = reply.content.clone().unwrap_or_default();
    let mut requests = Vec::new();

    for (index, call) in reply.tool_calls.iter().flatten().enumerate() {
        let id = call.id.as_deref().unwrap_or_default();
        let name = call.name().unwrap_or_default();
        if id.is_empty() || name.is_empty() {
            warn!(index, id, tool = name, "dropping tool call without id or name");
            continue;
        }

        let raw = call.function.as_ref().and_then(|f| f.arguments.as_ref());
        match decode_arguments(raw) {
            Ok(arguments) => requests.push(ToolInvocationRequest::new(id, name, arguments)),
            Err(reason) => warn!(index, id, tool = name, %reason, "dropping tool call with malformed arguments"),
        }
    }

    Message::assistant_with_requests(Some(text), requests)
}

/// Decode a tool call's arguments. Blank or absent arguments mean "no arguments".
fn decode_arguments(raw: Option<&Value>) -> Result<Arguments, String> {
    match raw {
        None | Some(Value::Null) => Ok(Arguments::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Arguments::new()),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(format!("expected a JSON object, got {other}")),
            Err(e) => Err(e.to_string()),
        },
        Some(other) => Err(format!("expected a JSON object, got {other}")),
    }
}

/// User-facing notice for a failed model call.
fn failure_message(error: &ProviderError) -> Message {
    if error.is_rejection() {
        Message::assistant(format!(
            "Sorry, there was an issue configuring the request for the AI model (Details: {}).",
            error.detail()
        ))
    } else {
        generic_failure(error.kind())
    }
}

fn generic_failure(kind: &str) -> Message {
    Message::assistant(format!(
        "Sorry, I encountered an error trying to process your request ({kind}). Please try again."
    ))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_call, text_reply, tool_reply, ScriptedProvider};
    use agrisight_providers::wire::{ContentPart, WireContent};
    use serde_json::json;

    const TEXT: &str = "meta-llama/Meta-Llama-3.1-70B-Instruct-fast";
    const VISION: &str = "google/gemma-3-27b-it-fast";

    fn weather_schema() -> ToolSchema {
        ToolSchema::new("get_current_weather", "Get the weather", json!({"type": "object"}))
    }

    fn gateway(provider: Arc<ScriptedProvider>) -> ModelGateway {
        ModelGateway::new(provider, TEXT, VISION).with_tools(vec![weather_schema()])
    }

    fn leaf() -> ImagePayload {
        ImagePayload::new(vec![0xff, 0xd8, 0xff], "image/jpeg")
    }

    // ── Selection ──

    #[test]
    fn test_selection_by_input() {
        let text = BackendSelection::for_input(false, TEXT, VISION);
        assert_eq!(text.backend, Backend::Text);
        assert_eq!(text.model, TEXT);
        assert!(text.tools_enabled);

        let vision = BackendSelection::for_input(true, TEXT, VISION);
        assert_eq!(vision.backend, Backend::Vision);
        assert_eq!(vision.model, VISION);
        assert!(!vision.tools_enabled);
    }

    // ── Formatting ──

    #[test]
    fn test_format_drops_empty_messages() {
        let history = vec![
            Message::system(""),
            Message::user("   "),
            Message::assistant_with_requests(None, vec![]),
            Message::assistant_with_requests(Some(String::new()), vec![]),
            Message::user("Hi"),
        ];
        let wire = format_messages(&history, None);
        assert_eq!(wire, vec![WireMessage::user("Hi")]);
    }

    #[test]
    fn test_format_requests_and_results() {
        let mut args = Arguments::new();
        args.insert("location".into(), json!("Jakarta"));
        let history = vec![
            Message::system("d"),
            Message::user("weather?"),
            Message::assistant_with_requests(
                Some(String::new()),
                vec![ToolInvocationRequest::new("a1", "get_current_weather", args)],
            ),
            Message::tool_result("a1", "get_current_weather", "{\"temperature\":30}"),
        ];

        let wire = format_messages(&history, None);
        assert_eq!(wire.len(), 4);

        let calls = wire[2].tool_calls.as_ref().unwrap();
        assert!(wire[2].content.is_none());
        let raw = calls[0].function.as_ref().unwrap().arguments.as_ref().unwrap();
        let decoded: Value = serde_json::from_str(raw.as_str().unwrap()).unwrap();
        assert_eq!(decoded, json!({"location": "Jakarta"}));

        assert_eq!(wire[3].role, "tool");
        assert_eq!(wire[3].tool_call_id.as_deref(), Some("a1"));
        assert_eq!(wire[3].name.as_deref(), Some("get_current_weather"));
    }

    #[test]
    fn test_image_goes_on_latest_user_message_only() {
        let history = vec![
            Message::system("d"),
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("what disease is this?"),
        ];
        let wire = format_messages(&history, Some(&leaf()));

        assert_eq!(wire.len(), 4);
        assert!(!wire[1].has_image());
        assert!(wire[3].has_image());

        let Some(WireContent::Parts(parts)) = &wire[3].content else {
            panic!("expected multipart content");
        };
        assert_eq!(parts[0], ContentPart::Text { text: "what disease is this?".into() });
        match &parts[1] {
            ContentPart::ImageUrl { image_url } => {
                assert_eq!(image_url.url, "data:image/jpeg;base64,/9j/");
            }
            other => panic!("expected image part, got {other:?}"),
        }
    }

    #[test]
    fn test_image_without_user_message_is_synthesised() {
        let wire = format_messages(&[Message::system("d")], Some(&leaf()));
        assert_eq!(wire.len(), 2);
        assert!(wire[1].has_image());
        let Some(WireContent::Parts(parts)) = &wire[1].content else {
            panic!("expected multipart content");
        };
        assert_eq!(parts[0], ContentPart::Text { text: IMAGE_PROMPT.into() });
    }

    #[test]
    fn test_blank_caption_keeps_image() {
        let wire = format_messages(&[Message::user("")], Some(&leaf()));
        assert_eq!(wire.len(), 1);
        assert!(wire[0].has_image());
    }

    // ── Parsing ──

    #[test]
    fn test_parse_text_reply() {
        let msg = parse_reply(&text_reply("Hello!"));
        assert_eq!(msg, Message::assistant("Hello!"));
        assert!(!msg.has_pending_requests());
    }

    #[test]
    fn test_parse_missing_text_defaults_to_empty() {
        let msg = parse_reply(&tool_reply(&[("a1", "get_current_weather", "{\"location\":\"Jakarta\"}")]));
        assert_eq!(msg.text(), Some(""));
        assert_eq!(msg.requests().len(), 1);
        assert_eq!(msg.requests()[0].arguments["location"], "Jakarta");
    }

    #[test]
    fn test_parse_drops_malformed_entries_only() {
        let msg = parse_reply(&tool_reply(&[
            ("a1", "get_current_weather", "{not json"),
            ("a2", "get_current_weather", "[1, 2]"),
            ("a3", "get_current_weather", ""),
            ("a4", "web_search", "{\"query\":\"rice\"}"),
        ]));
        let ids: Vec<&str> = msg.requests().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a4"]);
        assert!(msg.requests()[0].arguments.is_empty());
    }

    #[test]
    fn test_parse_drops_calls_without_id_or_name() {
        let response = ChatCompletionResponse::single(ResponseMessage::with_tool_calls(
            Some("checking".into()),
            vec![
                raw_call(None, Some("get_current_weather"), json!("{}")),
                raw_call(Some("b2"), None, json!("{}")),
                raw_call(Some(""), Some("get_current_weather"), json!("{}")),
                raw_call(Some("b4"), Some("get_current_weather"), json!({"location": "Dallas"})),
            ],
        ));
        let msg = parse_reply(&response);
        assert_eq!(msg.requests().len(), 1);
        assert_eq!(msg.requests()[0].id, "b4");
        assert_eq!(msg.requests()[0].arguments["location"], "Dallas");
        assert_eq!(msg.text(), Some("checking"));
    }

    #[test]
    fn test_parse_empty_response() {
        let msg = parse_reply(&ChatCompletionResponse::default());
        assert_eq!(msg, Message::assistant(""));
    }

    // ── complete() ──

    #[tokio::test]
    async fn test_complete_text_turn_advertises_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply("Hello!"))]));
        let gw = gateway(provider.clone()).with_max_tokens(Some(256));

        let history = vec![Message::system("d"), Message::user("Hi")];
        let reply = gw.complete(&history, &gw.select(false), None).await;

        assert_eq!(reply, Message::assistant("Hello!"));
        let req = &provider.requests()[0];
        assert_eq!(req.model, TEXT);
        assert_eq!(req.tool_choice.as_deref(), Some("auto"));
        assert_eq!(req.tools.as_ref().unwrap()[0].function.name, "get_current_weather");
        assert_eq!(req.temperature, 0.6);
        assert_eq!(req.max_tokens, Some(256));
    }

    #[tokio::test]
    async fn test_complete_vision_turn_disables_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply("Leaf rust."))]));
        let gw = gateway(provider.clone());

        let history = vec![Message::system("d"), Message::user("what is this?")];
        let reply = gw.complete(&history, &gw.select(true), Some(&leaf())).await;

        assert_eq!(reply.text(), Some("Leaf rust."));
        let req = &provider.requests()[0];
        assert_eq!(req.model, VISION);
        assert!(req.tools.is_none());
        assert!(req.tool_choice.is_none());
        assert!(req.messages.last().unwrap().has_image());
    }

    #[tokio::test]
    async fn test_complete_empty_history_skips_backend() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let gw = gateway(provider.clone());

        let reply = gw.complete(&[Message::system("  ")], &gw.select(false), None).await;

        assert_eq!(reply, Message::assistant(EMPTY_HISTORY_NOTICE));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_complete_rejection_becomes_notice() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Rejected {
            status: 400,
            detail: "Invalid image".into(),
        })]));
        let gw = gateway(provider);

        let reply = gw.complete(&[Message::user("Hi")], &gw.select(false), None).await;

        assert_eq!(
            reply.text(),
            Some("Sorry, there was an issue configuring the request for the AI model (Details: Invalid image).")
        );
        assert!(!reply.has_pending_requests());
    }

    #[tokio::test]
    async fn test_complete_other_failure_becomes_generic_notice() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Transport(
            "connection refused".into(),
        ))]));
        let gw = gateway(provider);

        let reply = gw.complete(&[Message::user("Hi")], &gw.select(false), None).await;

        assert_eq!(
            reply.text(),
            Some("Sorry, I encountered an error trying to process your request (Transport). Please try again.")
        );
    }

    struct PanickingProvider;

    #[async_trait::async_trait]
    impl LlmProvider for PanickingProvider {
        async fn complete(&self, _request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
            panic!("backend client bug")
        }

        fn display_name(&self) -> &str {
            "Panicking"
        }
    }

    #[tokio::test]
    async fn test_complete_panic_becomes_generic_notice() {
        let gw = ModelGateway::new(Arc::new(PanickingProvider), TEXT, VISION);

        let reply = gw.complete(&[Message::user("Hi")], &gw.select(false), None).await;

        assert_eq!(
            reply.text(),
            Some("Sorry, I encountered an error trying to process your request (Panic). Please try again.")
        );
        assert!(!reply.has_pending_requests());
    }

    #[tokio::test]
    async fn test_complete_timeout_is_rejection_class() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![Ok(text_reply("late"))]).with_delay(Duration::from_secs(5)),
        );
        let gw = gateway(provider).with_timeout(Duration::from_millis(50));

        let reply = gw.complete(&[Message::user("Hi")], &gw.select(false), None).await;

        let text = reply.text().unwrap();
        assert!(text.starts_with("Sorry, there was an issue configuring the request"));
        assert!(text.contains("timed out"));
    }
}
