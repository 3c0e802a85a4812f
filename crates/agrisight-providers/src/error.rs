//! Provider error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Why a completion request failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend refused the request as malformed (HTTP 400/422).
    #[error("request rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Any other non-success HTTP status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, DNS, TLS, or similar failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Short class name, used in logs and user-facing notices.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Rejected { .. } => "Rejected",
            ProviderError::Status { .. } => "Status",
            ProviderError::Timeout(_) => "Timeout",
            ProviderError::Transport(_) => "Transport",
            ProviderError::Decode(_) => "Decode",
        }
    }

    /// Whether the request itself was at fault, rather than the backend.
    /// Timeouts are grouped with rejections.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ProviderError::Rejected { .. } | ProviderError::Timeout(_))
    }

    /// Detail text suitable for showing to the user.
    pub fn detail(&self) -> String {
        match self {
            ProviderError::Rejected { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
