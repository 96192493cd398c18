//! Transcript messages.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Typed by the user.
    User,
    /// Generated by the model.
    Assistant,
    /// A failed turn, shown in the transcript but never sent upstream.
    Error,
}

impl ChatRole {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Error => "error",
        }
    }
}

/// One entry in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Model that generated an assistant reply, when the relay reported it.
    pub model: Option<String>,
}

impl ChatMessage {
    /// A user message stamped now.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(ChatRole::User, content.into(), None)
    }

    /// An assistant reply stamped now.
    #[must_use]
    pub fn assistant(content: impl Into<String>, model: Option<String>) -> Self {
        Self::now(ChatRole::Assistant, content.into(), model)
    }

    /// An error entry; the text is prefixed with `Error: `.
    #[must_use]
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self::now(ChatRole::Error, format!("Error: {reason}"), None)
    }

    fn now(role: ChatRole, content: String, model: Option<String>) -> Self {
        Self {
            role,
            content,
            // Millisecond precision, matching what storage keeps.
            timestamp: Utc::now().trunc_subsecs(3),
            model,
        }
    }
}
