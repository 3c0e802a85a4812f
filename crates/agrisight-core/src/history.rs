//! History manager — keeps the conversation bounded and well-formed.
//!
//! Two rules are enforced here:
//! - the directive is a singleton pinned at index 0;
//! - trimming drops the oldest non-directive entries and never leaves a tool
//!   result without the assistant message that requested it.

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Message;

/// Default maximum number of messages kept per conversation (directive included).
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Install `text` as the directive at index 0.
///
/// Replaces the content of an existing directive, moves a misplaced one to
/// the front, and removes duplicates.
pub fn ensure_directive(history: &mut Vec<Message>, text: &str) {
    let before = history.len();
    let had_directive = history.iter().any(Message::is_directive);

    history.retain(|m| !m.is_directive());
    history.insert(0, Message::system(text));

    if !had_directive && before > 0 {
        warn!(messages = before, "re-added missing directive to history");
    } else if before + 1 - history.len() > 1 {
        debug!(removed = before + 1 - history.len(), "collapsed duplicate directives");
    }
}

/// Trim `history` to at most `max_len` entries.
///
/// Returns the number of messages removed. A history already within bound is
/// left untouched, so trimming twice is the same as trimming once.
pub fn trim(history: &mut Vec<Message>, max_len: usize) -> usize {
    let len = history.len();
    if len <= max_len {
        return 0;
    }

    let pinned = usize::from(history.first().is_some_and(Message::is_directive));
    let keep_tail = max_len.saturating_sub(pinned);
    let mut start = len - keep_tail;

    // A tool result whose assistant message is gone cannot be sent.
    while start < len && matches!(history[start], Message::Tool { .. }) {
        start += 1;
    }

    let removed = start - pinned;
    history.drain(pinned..start);
    debug!(removed, kept = history.len(), max_len, "trimmed history");
    removed
}

// ─────────────────────────────────────────────
// Invariant checking
// ─────────────────────────────────────────────

/// A structural violation found by [`validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryViolation {
    #[error("directive found at index {0}; it must be first")]
    MisplacedDirective(usize),

    #[error("tool result at index {index} has id '{found}', expected '{expected}'")]
    UnexpectedResult {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("tool result at index {0} does not follow an assistant request")]
    OrphanResult(usize),

    #[error("assistant message at index {index} is missing {missing} tool result(s)")]
    MissingResults { index: usize, missing: usize },
}

/// Check the structural invariants of a conversation.
///
/// An assistant message with requests at the very end is accepted: that is
/// the shape of a history in the middle of a turn.
pub fn validate(history: &[Message]) -> Result<(), HistoryViolation> {
    let mut expected: std::collections::VecDeque<&str> = Default::default();
    let mut owner = 0;

    for (index, message) in history.iter().enumerate() {
        match message {
            Message::System { .. } if index != 0 => {
                return Err(HistoryViolation::MisplacedDirective(index));
            }
            Message::Tool { tool_call_id, .. } => match expected.pop_front() {
                Some(id) if id == tool_call_id.as_str() => {}
                Some(id) => {
                    return Err(HistoryViolation::UnexpectedResult {
                        index,
                        expected: id.to_string(),
                        found: tool_call_id.clone(),
                    });
                }
                None => return Err(HistoryViolation::OrphanResult(index)),
            },
            other => {
                if !expected.is_empty() {
                    return Err(HistoryViolation::MissingResults {
                        index: owner,
                        missing: expected.len(),
                    });
                }
                if let Message::Assistant { tool_calls, .. } = other {
                    owner = index;
                    expected.extend(tool_calls.iter().map(|r| r.id.as_str()));
                }
            }
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
