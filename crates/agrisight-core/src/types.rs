//! Core types for AgriSight — the role-tagged conversation model.
//!
//! A conversation is an ordered `Vec<Message>`. Every consumer matches on the
//! closed [`Message`] enum, so adding a variant forces a review of each one.
//! The wire format sent to a backend lives in `agrisight-providers`; these
//! types are what the agent keeps in history and persists per session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Keyword-style arguments for a tool call.
pub type Arguments = Map<String, Value>;

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// One entry of the conversation log.
///
/// Serialized with a `role` tag so session files stay readable:
/// `{"role":"user","content":"Hi"}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    /// Behavioral instructions. At most one, always at index 0.
    #[serde(rename = "system")]
    System { content: String },

    /// End-user input. The image is transient and never persisted.
    #[serde(rename = "user")]
    User {
        content: String,
        #[serde(skip)]
        image: Option<ImagePayload>,
    },

    /// Model reply. An empty `tool_calls` list marks the end of a turn.
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocationRequest>,
    },

    /// Output of one tool call, paired to its request by `tool_call_id`.
    #[serde(rename = "tool")]
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    /// Create a system directive.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a text-only user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
            image: None,
        }
    }

    /// Create a user message carrying an image.
    pub fn user_with_image(content: impl Into<String>, image: ImagePayload) -> Self {
        Message::User {
            content: content.into(),
            image: Some(image),
        }
    }

    /// Create a terminal assistant message (no tool calls).
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message requesting tool calls.
    pub fn assistant_with_requests(
        content: Option<String>,
        tool_calls: Vec<ToolInvocationRequest>,
    ) -> Self {
        Message::Assistant {
            content,
            tool_calls,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Whether this is the system directive.
    pub fn is_directive(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    /// Text carried by the message, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::System { content } => Some(content),
            Message::User { content, .. } => Some(content),
            Message::Assistant { content, .. } => content.as_deref(),
            Message::Tool { content, .. } => Some(content),
        }
    }

    /// Invocation requests of an assistant message; empty for other roles.
    pub fn requests(&self) -> &[ToolInvocationRequest] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Whether an assistant message still has tool calls to run.
    ///
    /// Only requests with a non-empty id count: without an id no result
    /// could ever be paired back to them.
    pub fn has_pending_requests(&self) -> bool {
        self.requests().iter().any(|r| !r.id.is_empty())
    }
}

// ─────────────────────────────────────────────
// Images
// ─────────────────────────────────────────────

/// Raw image bytes attached to a user turn (vision input).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `"image/jpeg"`.
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Guess the MIME type from a file extension, defaulting to JPEG
    /// (the format chat platforms deliver photos in).
    pub fn from_path_bytes(path: &str, bytes: Vec<u8>) -> Self {
        let lower = path.to_lowercase();
        let mime = if lower.ends_with(".png") {
            "image/png"
        } else if lower.ends_with(".gif") {
            "image/gif"
        } else if lower.ends_with(".webp") {
            "image/webp"
        } else {
            "image/jpeg"
        };
        Self::new(bytes, mime)
    }
}

// ─────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────

/// A backend-issued request to run one tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocationRequest {
    /// Opaque id assigned by the backend, unique within its assistant message.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// Decoded arguments.
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolInvocationRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// A request needs both an id and a tool name to be executable.
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }
}

/// Machine-readable description of a tool, advertised to the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

// ─────────────────────────────────────────────
// Session types
// ─────────────────────────────────────────────

/// Per-user conversation state: history plus a free-form profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// User id the session belongs to.
    pub key: String,
    pub messages: Vec<Message>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Profile fields such as `name`, `language`, `region`.
    #[serde(default)]
    pub profile: HashMap<String, String>,
}

impl Session {
    /// Create a new empty session.
    pub fn new(key: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Session {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            profile: HashMap::new(),
        }
    }

    /// Mark the session as modified.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
