//! Per-user session slots with optional JSONL persistence.
//!
//! File format: JSONL in `~/.agrisight/sessions/{escaped_key}.jsonl`
//! - Line 1: `{"_type":"metadata","key":"...","created_at":"...","updated_at":"...","profile":{}}`
//! - Line 2+: `{"role":"user","content":"hello"}`

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::schema::SessionsConfig;
use crate::types::{Message, Session};
use crate::utils;

/// Exclusive access to one user's session for the duration of a turn.
pub type SessionGuard = OwnedMutexGuard<Session>;

type Slot = Arc<AsyncMutex<Session>>;

// ─────────────────────────────────────────────
// Session metadata (first line of JSONL)
// ─────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct SessionMetadata {
    #[serde(rename = "_type")]
    record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    profile: HashMap<String, String>,
}

// ─────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────

/// Keeps one lockable session per user id.
///
/// The outer map lock is held only long enough to find or insert a slot.
/// A turn then owns its user's slot guard, so two users never wait on each
/// other while a model or tool call is in flight. Two turns for the same
/// user are serialized on that user's slot.
pub struct SessionStore {
    /// Where `.jsonl` files live. `None` keeps everything in memory.
    sessions_dir: Option<PathBuf>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SessionStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        SessionStore {
            sessions_dir: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// A store backed by JSONL files.
    ///
    /// `sessions_dir` defaults to `~/.agrisight/sessions/` if `None`.
    /// The directory is created if it doesn't exist.
    pub fn persistent(sessions_dir: Option<PathBuf>) -> std::io::Result<Self> {
        let dir = sessions_dir.unwrap_or_else(utils::get_sessions_path);
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "session store ready");

        Ok(SessionStore {
            sessions_dir: Some(dir),
            slots: Mutex::new(HashMap::new()),
        })
    }

    /// Build a store from the `sessions` config section.
    pub fn from_config(config: &SessionsConfig) -> std::io::Result<Self> {
        if !config.persist {
            return Ok(Self::in_memory());
        }
        Self::persistent(config.dir.as_deref().map(utils::expand_home))
    }

    /// Whether sessions are written to disk.
    pub fn is_persistent(&self) -> bool {
        self.sessions_dir.is_some()
    }

    /// Lock the session for `key`, creating it on first contact.
    ///
    /// Waits only while another turn for the same key holds the guard.
    pub async fn acquire(&self, key: &str) -> SessionGuard {
        self.slot(key).lock_owned().await
    }

    /// Write a session to disk. A no-op for in-memory stores.
    pub fn save(&self, session: &Session) -> std::io::Result<()> {
        match &self.sessions_dir {
            Some(dir) => save_to_disk(&session_path(dir, &session.key), session),
            None => Ok(()),
        }
    }

    /// Reset a session's messages, keeping its profile.
    pub async fn clear(&self, key: &str) -> std::io::Result<()> {
        let mut session = self.acquire(key).await;
        session.messages.clear();
        session.touch();
        self.save(&session)
    }

    /// Drop a session from memory. The disk copy, if any, is kept and will be
    /// reloaded on the next `acquire`.
    ///
    /// Returns `true` if the session was cached.
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.lock_slots().remove(key).is_some();
        if removed {
            debug!(key, "evicted session");
        }
        removed
    }

    /// Delete a session entirely (from memory and disk).
    ///
    /// Returns `true` if anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let cached = self.lock_slots().remove(key).is_some();

        let Some(dir) = &self.sessions_dir else {
            return cached;
        };
        let path = session_path(dir, key);
        if !path.exists() {
            return cached;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted session file: {}", path.display());
                true
            }
            Err(e) => {
                warn!("Failed to delete session file {}: {}", path.display(), e);
                cached
            }
        }
    }

    /// Number of sessions currently held in memory.
    pub fn cached_count(&self) -> usize {
        self.lock_slots().len()
    }

    /// List known sessions, newest first.
    ///
    /// Persistent stores read the metadata line of every file. In-memory
    /// stores report cached sessions that are not locked by a running turn.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries = match &self.sessions_dir {
            Some(dir) => list_from_disk(dir),
            None => self.list_cached(),
        };
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    fn list_cached(&self) -> Vec<SessionSummary> {
        let slots: Vec<Slot> = self.lock_slots().values().cloned().collect();
        slots
            .iter()
            .filter_map(|slot| {
                let session = slot.try_lock().ok()?;
                Some(SessionSummary {
                    key: session.key.clone(),
                    created_at: session.created_at,
                    updated_at: session.updated_at,
                    message_count: session.messages.len(),
                    path: None,
                })
            })
            .collect()
    }

    /// Find or create the slot for `key`.
    fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.lock_slots().get(key) {
            return slot.clone();
        }

        // Disk reads happen outside the map lock.
        let session = self
            .sessions_dir
            .as_deref()
            .and_then(|dir| load_from_disk(&session_path(dir, key), key))
            .unwrap_or_else(|| {
                debug!(key, "created new session");
                Session::new(key)
            });

        self.lock_slots()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(session)))
            .clone()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Summary of a session for listing purposes.
#[derive(Clone, Debug)]
pub struct SessionSummary {
    /// Session key (the user id).
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    /// Path to the JSONL file, for persistent stores.
    pub path: Option<PathBuf>,
}

// ─────────────────────────────────────────────
// JSONL files
// ─────────────────────────────────────────────

/// Get the JSONL file path for a session key.
fn session_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.jsonl", utils::safe_filename(key)))
}

fn load_from_disk(path: &Path, key: &str) -> Option<Session> {
    if !path.exists() {
        return None;
    }

    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to open session file {}: {}", path.display(), e);
            return None;
        }
    };

    let mut session = Session::new(key);
    let mut skipped = 0usize;

    for line in std::io::BufReader::new(file).lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }

        if let Ok(meta) = serde_json::from_str::<SessionMetadata>(&line) {
            if meta.record_type == "metadata" {
                if meta.key.as_deref().is_some_and(|stored| stored != key) {
                    warn!(
                        key,
                        stored = meta.key.as_deref().unwrap_or_default(),
                        path = %path.display(),
                        "session file belongs to another key, ignoring it"
                    );
                    return None;
                }
                session.created_at = meta.created_at;
                session.updated_at = meta.updated_at;
                session.profile = meta.profile;
                continue;
            }
        }

        match serde_json::from_str::<Message>(&line) {
            Ok(msg) => session.messages.push(msg),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(key, skipped, "skipped unreadable session lines");
    }
    debug!(
        "Loaded session '{}' with {} messages from disk",
        key,
        session.messages.len()
    );
    Some(session)
}

fn save_to_disk(path: &Path, session: &Session) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    let meta = SessionMetadata {
        record_type: "metadata".to_string(),
        key: Some(session.key.clone()),
        created_at: session.created_at,
        updated_at: session.updated_at,
        profile: session.profile.clone(),
    };
    writeln!(file, "{}", serde_json::to_string(&meta)?)?;

    for msg in &session.messages {
        writeln!(file, "{}", serde_json::to_string(msg)?)?;
    }
    file.flush()?;

    debug!(
        "Saved session '{}' ({} messages) to {}",
        session.key,
        session.messages.len(),
        path.display()
    );
    Ok(())
}

fn list_from_disk(dir: &Path) -> Vec<SessionSummary> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read sessions directory: {}", e);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|path| {
            let file = std::fs::File::open(&path).ok()?;
            let mut lines = std::io::BufReader::new(file).lines().map_while(Result::ok);
            let meta: SessionMetadata = serde_json::from_str(&lines.next()?).ok()?;
            let message_count = lines.filter(|l| !l.trim().is_empty()).count();
            let key = meta.key.unwrap_or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string()
            });

            Some(SessionSummary {
                key,
                created_at: meta.created_at,
                updated_at: meta.updated_at,
                message_count,
                path: Some(path),
            })
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
