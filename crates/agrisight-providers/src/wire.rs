//! OpenAI chat-completions wire types.
//!
//! These mirror the JSON the backend speaks. The agent's own conversation
//! model is richer and lives in `agrisight-core`; the gateway translates
//! between the two.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────

/// Request body for `POST {api_base}/chat/completions`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// One message in wire form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<WireContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WireMessage {
    fn bare(role: &str, content: Option<WireContent>) -> Self {
        WireMessage {
            role: role.to_string(),
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::bare("system", Some(WireContent::Text(text.into())))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::bare("user", Some(WireContent::Text(text.into())))
    }

    /// User message with text plus one image (`data:` URI or plain URL).
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        let parts = vec![
            ContentPart::Text { text: text.into() },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image_url.into(),
                    detail: None,
                },
            },
        ];
        Self::bare("user", Some(WireContent::Parts(parts)))
    }

    pub fn assistant(text: Option<String>, tool_calls: Vec<WireToolCall>) -> Self {
        let mut msg = Self::bare("assistant", text.map(WireContent::Text));
        if !tool_calls.is_empty() {
            msg.tool_calls = Some(tool_calls);
        }
        msg
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        WireMessage {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::bare("tool", Some(WireContent::Text(content.into())))
        }
    }

    /// Whether this message carries image parts.
    pub fn has_image(&self) -> bool {
        matches!(&self.content, Some(WireContent::Parts(parts))
            if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
    }
}

/// Message content — plain text or multipart (for vision).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single part of a multipart message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image URL payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ─────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────

/// A tool call as it appears on the wire.
///
/// Every field is optional on the way in: backends occasionally omit the id
/// or the function name, and the gateway decides what to do with those.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WireToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCall>,
}

impl WireToolCall {
    /// Build an outgoing call with JSON-encoded arguments.
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        WireToolCall {
            id: Some(id.into()),
            call_type: Some("function".to_string()),
            function: Some(FunctionCall {
                name: Some(name.into()),
                arguments: Some(Value::String(arguments.into())),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.function.as_ref()?.name.as_deref()
    }
}

/// The function name and arguments within a tool call.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Normally a JSON-encoded string. Some servers send an object instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Definition of a tool, advertised to the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Schema of a function tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

/// Raw chat completion response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

impl ChatCompletionResponse {
    /// Build a response holding a single assistant message.
    pub fn single(message: ResponseMessage) -> Self {
        ChatCompletionResponse {
            id: None,
            choices: vec![ChatChoice {
                message,
                finish_reason: None,
            }],
            usage: None,
        }
    }

    /// The first choice's message, if there is one.
    pub fn first_message(&self) -> Option<&ResponseMessage> {
        self.choices.first().map(|c| &c.message)
    }
}

/// A single choice in a chat completion response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message within a chat completion choice.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

impl ResponseMessage {
    pub fn text(content: impl Into<String>) -> Self {
        ResponseMessage {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    pub fn with_tool_calls(content: Option<String>, tool_calls: Vec<WireToolCall>) -> Self {
        ResponseMessage {
            content,
            tool_calls: Some(tool_calls),
        }
    }
}

/// Token usage statistics. Servers may omit any of the counts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_with_tools() {
        let request = ChatCompletionRequest {
            model: "meta-llama/Meta-Llama-3.1-70B-Instruct-fast".into(),
            messages: vec![WireMessage::system("You are AgriSight Bot."), WireMessage::user("Hi")],
            tools: Some(vec![ToolDefinition::new(
                "get_current_weather",
                "Get the weather",
                json!({"type": "object"}),
            )]),
            tool_choice: Some("auto".into()),
            temperature: 0.6,
            max_tokens: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hi");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "get_current_weather");
        assert_eq!(json["tool_choice"], "auto");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_without_tools_omits_fields() {
        let request = ChatCompletionRequest {
            model: "google/gemma-3-27b-it-fast".into(),
            messages: vec![WireMessage::user_with_image("look", "data:image/png;base64,AAA")],
            tools: None,
            tool_choice: None,
            temperature: 0.6,
            max_tokens: Some(512),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert_eq!(json["max_tokens"], 512);

        let parts = json["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAA");
    }

    #[test]
    fn test_assistant_and_tool_messages() {
        let assistant = WireMessage::assistant(
            None,
            vec![WireToolCall::function("a1", "get_current_weather", r#"{"location":"Jakarta"}"#)],
        );
        let json = serde_json::to_value(&assistant).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["tool_calls"][0]["id"], "a1");
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], r#"{"location":"Jakarta"}"#);

        let tool = WireMessage::tool("a1", "get_current_weather", "30C");
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "a1");
        assert_eq!(json["name"], "get_current_weather");
        assert_eq!(json["content"], "30C");
    }

    #[test]
    fn test_plain_assistant_has_no_tool_calls_key() {
        let json = serde_json::to_value(WireMessage::assistant(Some("Hi".into()), vec![])).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert_eq!(json["content"], "Hi");
    }

    #[test]
    fn test_response_with_partial_tool_calls() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"type": "function", "function": {"name": "web_search", "arguments": "{}"}},
                        {"id": "b2", "function": {"arguments": {"query": "rice"}}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let msg = resp.first_message().unwrap();
        let calls = msg.tool_calls.as_ref().unwrap();
        assert!(calls[0].id.is_none());
        assert_eq!(calls[0].name(), Some("web_search"));
        assert_eq!(calls[1].name(), None);
        assert!(calls[1].function.as_ref().unwrap().arguments.as_ref().unwrap().is_object());
    }

    #[test]
    fn test_response_without_choices() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert!(resp.first_message().is_none());
    }

    #[test]
    fn test_has_image() {
        assert!(WireMessage::user_with_image("a", "data:image/jpeg;base64,AA").has_image());
        assert!(!WireMessage::user("a").has_image());
    }
}
