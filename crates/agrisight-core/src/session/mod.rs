//! Per-user session store — one lockable slot per user id, optional JSONL files.
//!
//! # Disk format (JSONL)
//!
//! Each session is a `.jsonl` file under `~/.agrisight/sessions/`.
//! - Line 1: metadata `{"_type": "metadata", "created_at": "...", "updated_at": "...", "profile": {}}`
//! - Lines 2+: messages `{"role": "user", "content": "hello"}`

pub mod store;

pub use store::{SessionGuard, SessionStore, SessionSummary};
