//! Local key/value storage and the saved-sessions blob.
//!
//! Storage mirrors browser `localStorage`: string keys, string values,
//! synchronous access. The whole session collection lives under
//! [`STORAGE_KEY`] as one JSON array and is rewritten on every change.
//!
//! Stored data is a best-effort cache. Anything that fails to parse is
//! discarded with a warning rather than reported as an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::collection::{ChatSession, SessionCollection};
use super::message::{ChatMessage, ChatRole};

/// Key holding the serialized session collection.
pub const STORAGE_KEY: &str = "chat-sessions";

/// Errors raised by a [`LocalStorage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be mapped to a storage slot.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Synchronous string key/value store.
pub trait LocalStorage: Send + Sync + std::fmt::Debug {
    /// Read a value; `Ok(None)` when the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage backed by one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for storage, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a half-written blob.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds valid strings.
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items().remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persisted record format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    id: String,
    title: String,
    messages: Vec<StoredMessage>,
    last_updated: String, // RFC3339
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    role: ChatRole,
    content: String,
    timestamp: String, // RFC3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

impl From<&ChatSession> for StoredSession {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            title: session.title.clone(),
            messages: session
                .messages
                .iter()
                .map(|m| StoredMessage {
                    role: m.role,
                    content: m.content.clone(),
                    timestamp: format_instant(m.timestamp),
                    model: m.model.clone(),
                })
                .collect(),
            last_updated: format_instant(session.last_updated),
        }
    }
}

impl TryFrom<StoredSession> for ChatSession {
    type Error = chrono::ParseError;

    fn try_from(stored: StoredSession) -> Result<Self, Self::Error> {
        let messages = stored
            .messages
            .into_iter()
            .map(|m| {
                Ok(ChatMessage {
                    role: m.role,
                    content: m.content,
                    timestamp: parse_instant(&m.timestamp)?,
                    model: m.model,
                })
            })
            .collect::<Result<Vec<_>, chrono::ParseError>>()?;

        Ok(Self {
            id: stored.id,
            title: stored.title,
            messages,
            last_updated: parse_instant(&stored.last_updated)?,
        })
    }
}

/// Serialize sessions to the stored JSON form.
pub fn encode_sessions(sessions: &[ChatSession]) -> Result<String, serde_json::Error> {
    let stored: Vec<StoredSession> = sessions.iter().map(StoredSession::from).collect();
    serde_json::to_string(&stored)
}

/// Parse the stored JSON form. Any malformed record rejects the whole blob.
pub fn decode_sessions(raw: &str) -> Result<Vec<ChatSession>, String> {
    let stored: Vec<StoredSession> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    stored
        .into_iter()
        .map(|s| ChatSession::try_from(s).map_err(|e| e.to_string()))
        .collect()
}

/// Load the saved collection. Missing, unreadable or malformed data yields an
/// empty collection.
pub fn load_sessions(storage: &dyn LocalStorage) -> SessionCollection {
    let raw = match storage.get_item(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SessionCollection::new(),
        Err(e) => {
            tracing::warn!(
                name: "storage.read.failed",
                error = %e,
                "Could not read saved chats; starting empty"
            );
            return SessionCollection::new();
        }
    };

    match decode_sessions(&raw) {
        Ok(sessions) => SessionCollection::from_sessions(sessions),
        Err(reason) => {
            tracing::warn!(
                name: "storage.discarded",
                key = STORAGE_KEY,
                reason = %reason,
                "Discarding malformed saved chats"
            );
            SessionCollection::new()
        }
    }
}

/// Persist the whole collection. Failures are logged and otherwise ignored.
pub fn save_sessions(storage: &dyn LocalStorage, sessions: &SessionCollection) {
    let result = encode_sessions(sessions.as_slice())
        .map_err(|e| e.to_string())
        .and_then(|encoded| {
            storage
                .set_item(STORAGE_KEY, &encoded)
                .map_err(|e| e.to_string())
        });
    if let Err(e) = result {
        tracing::warn!(name: "storage.write.failed", error = %e, "Could not save chats");
    }
}

/// Erase the persisted collection.
pub fn erase_sessions(storage: &dyn LocalStorage) {
    if let Err(e) = storage.remove_item(STORAGE_KEY) {
        tracing::warn!(name: "storage.erase.failed", error = %e, "Could not erase saved chats");
    }
}
