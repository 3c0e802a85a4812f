//! Chat backend layer for AgriSight.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait that all providers implement
//! - [`wire`] — OpenAI chat-completions request/response types
//! - [`http_provider::HttpProvider`] — generic OpenAI-compatible HTTP client
//! - [`error::ProviderError`] — failure classes (rejected, status, timeout, ...)

pub mod error;
pub mod http_provider;
pub mod traits;
pub mod wire;

// Re-export main types for convenience
pub use error::ProviderError;
pub use http_provider::{HttpProvider, ProviderSettings};
pub use traits::LlmProvider;
pub use wire::{ChatCompletionRequest, ChatCompletionResponse, ToolDefinition, WireMessage};
