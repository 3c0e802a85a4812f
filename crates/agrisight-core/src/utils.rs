//! Utility helpers — path resolution and string manipulation.

use std::path::PathBuf;

/// Get the AgriSight data directory (e.g. `~/.agrisight/`).
pub fn get_data_path() -> PathBuf {
    home_dir().join(".agrisight")
}

/// Get the sessions directory (e.g. `~/.agrisight/sessions/`).
pub fn get_sessions_path() -> PathBuf {
    get_data_path().join("sessions")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// The user's home directory, or the working directory when unknown.
fn home_dir() -> PathBuf {
    dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Turn an arbitrary key into a filename.
///
/// Every byte outside `[A-Za-z0-9_-]` is percent-escaped, so distinct keys
/// always map to distinct names.
pub fn safe_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}
