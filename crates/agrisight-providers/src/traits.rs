//! LLM provider trait — the seam between the agent and a chat backend.
//!
//! `HttpProvider` covers every OpenAI-compatible API. Tests plug in scripted
//! implementations.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::wire::{ChatCompletionRequest, ChatCompletionResponse};

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one chat completion request.
    ///
    /// The model is named in the request, so a single provider can serve
    /// both the text and the vision model of one endpoint.
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
