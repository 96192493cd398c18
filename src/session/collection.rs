//! Saved chat sessions.

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use super::message::{ChatMessage, ChatRole};

/// Maximum number of saved sessions; the least recently updated is evicted.
pub const MAX_SESSIONS: usize = 20;

/// Session titles are cut to this many characters.
pub const TITLE_MAX_CHARS: usize = 30;

/// Title used until a conversation has a user message.
pub const UNTITLED: &str = "New Chat";

/// A saved conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub last_updated: DateTime<Utc>,
}

impl ChatSession {
    /// Snapshot a conversation under `id`, stamped now.
    #[must_use]
    pub fn new(id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            id: id.into(),
            title: derive_title(&messages),
            messages,
            last_updated: Utc::now().trunc_subsecs(3),
        }
    }

    /// A fresh time-ordered session id.
    #[must_use]
    pub fn generate_id() -> String {
        Uuid::now_v7().to_string()
    }
}

/// Title from the first user message, trimmed and cut to
/// [`TITLE_MAX_CHARS`] characters.
#[must_use]
pub fn derive_title(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .find(|m| m.role == ChatRole::User)
        .map(|m| m.content.trim())
        .filter(|t| !t.is_empty())
        .map_or_else(
            || UNTITLED.to_string(),
            |t| t.chars().take(TITLE_MAX_CHARS).collect(),
        )
}

/// Saved sessions, most recently updated first, at most [`MAX_SESSIONS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCollection {
    sessions: Vec<ChatSession>,
}

impl SessionCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored sessions, keeping their order and the cap.
    #[must_use]
    pub fn from_sessions(mut sessions: Vec<ChatSession>) -> Self {
        sessions.truncate(MAX_SESSIONS);
        Self { sessions }
    }

    /// Insert or replace a session and move it to the front.
    ///
    /// Returns the session evicted to stay within [`MAX_SESSIONS`], if any.
    pub fn upsert(&mut self, session: ChatSession) -> Option<ChatSession> {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
        if self.sessions.len() > MAX_SESSIONS {
            self.sessions.pop()
        } else {
            None
        }
    }

    /// Remove a session by id. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        self.sessions.len() != before
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatSession> {
        self.sessions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> ChatSession {
        ChatSession::new(id, vec![ChatMessage::user(format!("hello from {id}"))])
    }

    #[test]
    fn test_title_truncated_to_thirty_chars() {
        let long = "a".repeat(45);
        let title = derive_title(&[ChatMessage::user(format!("  {long}  "))]);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let text = "こんにちは、今日はとても良い天気ですね。散歩に行きましょうか？";
        let title = derive_title(&[ChatMessage::user(text)]);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert!(text.starts_with(&title));
    }

    #[test]
    fn test_title_skips_leading_non_user_messages() {
        let messages = vec![
            ChatMessage::error("boom"),
            ChatMessage::user("what's up"),
        ];
        assert_eq!(derive_title(&messages), "what's up");
        assert_eq!(derive_title(&[]), UNTITLED);
    }

    #[test]
    fn test_upsert_moves_to_front() {
        let mut sessions = SessionCollection::new();
        sessions.upsert(session("a"));
        sessions.upsert(session("b"));
        sessions.upsert(session("a"));

        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_twenty_first_session_evicts_oldest() {
        let mut sessions = SessionCollection::new();
        for i in 0..MAX_SESSIONS {
            assert!(sessions.upsert(session(&format!("s{i}"))).is_none());
        }

        let evicted = sessions.upsert(session("newest")).unwrap();
        assert_eq!(evicted.id, "s0");
        assert_eq!(sessions.len(), MAX_SESSIONS);
        assert_eq!(sessions.as_slice()[0].id, "newest");
        assert!(sessions.get("s0").is_none());
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut sessions = SessionCollection::new();
        sessions.upsert(session("a"));
        assert!(sessions.remove("a"));
        assert!(!sessions.remove("a"));
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ChatSession::generate_id(), ChatSession::generate_id());
    }
}
