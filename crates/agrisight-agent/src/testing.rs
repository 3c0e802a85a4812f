//! Test doubles shared by the gateway, executor, and loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use agrisight_providers::wire::{FunctionCall, ResponseMessage, WireToolCall};
use agrisight_providers::{ChatCompletionRequest, ChatCompletionResponse, LlmProvider, ProviderError};

type Reply = Result<ChatCompletionResponse, ProviderError>;

/// A provider that returns canned replies in order and records every request.
///
/// Once the script runs out it keeps answering "done".
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: &ChatCompletionRequest) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(text_reply("done")))
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }
}

/// A reply with text only.
pub fn text_reply(text: &str) -> ChatCompletionResponse {
    ChatCompletionResponse::single(ResponseMessage::text(text))
}

/// A reply requesting tools: `(id, name, raw arguments string)`.
pub fn tool_reply(calls: &[(&str, &str, &str)]) -> ChatCompletionResponse {
    let calls = calls
        .iter()
        .map(|(id, name, args)| WireToolCall::function(*id, *name, *args))
        .collect();
    ChatCompletionResponse::single(ResponseMessage::with_tool_calls(None, calls))
}

/// A raw tool call with optional id and name.
pub fn raw_call(id: Option<&str>, name: Option<&str>, args: Value) -> WireToolCall {
    WireToolCall {
        id: id.map(String::from),
        call_type: Some("function".into()),
        function: Some(FunctionCall {
            name: name.map(String::from),
            arguments: Some(args),
        }),
    }
}
