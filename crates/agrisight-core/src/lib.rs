//! AgriSight core — message model, history manager, sessions, and config.
//!
//! - **types**: the role-tagged [`Message`](types::Message) enum and tool-call types
//! - **history**: directive pinning, trimming, and invariant checks
//! - **session**: per-user session slots with optional JSONL persistence
//! - **config**: `~/.agrisight/config.json` + env overrides

pub mod config;
pub mod history;
pub mod session;
pub mod types;
pub mod utils;
