//! Chat view state and rendering.
//!
//! The view holds only presentation state. Everything it shows comes from
//! the [`ConversationManager`] passed to each render call.

use std::fmt::Write;

use chrono::Local;

use crate::session::{ChatMessage, ChatRole, ConversationManager};

/// Messages shown while the transcript panel is collapsed.
pub const COLLAPSED_PANEL_MESSAGES: usize = 6;

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// Plain text to send.
    Send(String),
    NewChat,
    /// Load the chat at this 1-based sidebar position.
    Load(usize),
    /// Delete the chat at this 1-based sidebar position.
    Delete(usize),
    ClearAll,
    ToggleSidebar,
    TogglePanel,
    Help,
    Quit,
    /// A slash command that could not be understood.
    Unknown(String),
}

impl ViewCommand {
    /// Parse one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Send(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let index = parts.next().and_then(|n| n.parse::<usize>().ok());

        match (name, index) {
            ("new", _) => Self::NewChat,
            ("load", Some(n)) if n > 0 => Self::Load(n),
            ("delete", Some(n)) if n > 0 => Self::Delete(n),
            ("clear", _) => Self::ClearAll,
            ("sidebar", _) => Self::ToggleSidebar,
            ("expand", _) => Self::TogglePanel,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// Presentation-only state for the chat screen.
#[derive(Debug, Clone)]
pub struct ChatView {
    /// Text typed but not yet sent.
    pub input: String,
    /// Show the whole transcript instead of the latest messages.
    pub panel_expanded: bool,
    /// Hide the saved-chats sidebar.
    pub sidebar_collapsed: bool,
    model_label: String,
}

impl ChatView {
    /// Create a view for a relay serving `model_label`.
    pub fn new(model_label: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            panel_expanded: false,
            sidebar_collapsed: true,
            model_label: model_label.into(),
        }
    }

    /// Whether the send control is enabled.
    #[must_use]
    pub fn can_send(&self, manager: &ConversationManager) -> bool {
        !self.input.trim().is_empty() && !manager.is_loading()
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    pub fn toggle_panel(&mut self) {
        self.panel_expanded = !self.panel_expanded;
    }

    /// Id of the chat at a 1-based sidebar position.
    #[must_use]
    pub fn chat_id_at(manager: &ConversationManager, position: usize) -> Option<String> {
        position
            .checked_sub(1)
            .and_then(|i| manager.sessions().get(i))
            .map(|s| s.id.clone())
    }

    /// Full screen: sidebar (unless collapsed), transcript, status, footer.
    #[must_use]
    pub fn render(&self, manager: &ConversationManager) -> String {
        let mut out = String::new();
        if !self.sidebar_collapsed {
            out.push_str(&self.render_sidebar(manager));
            out.push('\n');
        }
        out.push_str(&self.render_transcript(manager));
        out.push_str(&self.render_status(manager));
        let _ = writeln!(out, "Using {} via OpenRouter", self.model_label);
        out
    }

    /// Saved chats, newest first, with the active one marked.
    #[must_use]
    pub fn render_sidebar(&self, manager: &ConversationManager) -> String {
        let sessions = manager.sessions();
        let mut out = String::from("── Chats ──\n");

        if sessions.is_empty() {
            out.push_str("No chats yet. Start a new conversation!\n");
            return out;
        }

        for (i, session) in sessions.iter().enumerate() {
            let marker = if manager.current_chat_id() == Some(session.id.as_str()) {
                '*'
            } else {
                ' '
            };
            let date = session.last_updated.with_timezone(&Local).format("%Y-%m-%d");
            let _ = writeln!(out, "{marker}{:>2}. {}  ({date})", i + 1, session.title);
        }

        let count = sessions.len();
        let _ = writeln!(out, "{count} chat{}", if count == 1 { "" } else { "s" });
        out
    }

    /// Transcript panel; collapsed shows only the latest messages.
    #[must_use]
    pub fn render_transcript(&self, manager: &ConversationManager) -> String {
        let messages = manager.messages();
        let mut out = String::new();

        if messages.is_empty() {
            out.push_str("Welcome! Start a conversation.\n");
            out.push_str("Ask anything. Type /help for commands.\n");
            return out;
        }

        let hidden = if self.panel_expanded {
            0
        } else {
            messages.len().saturating_sub(COLLAPSED_PANEL_MESSAGES)
        };
        if hidden > 0 {
            let _ = writeln!(out, "… {hidden} earlier messages (/expand to show)");
        }

        for message in &messages[hidden..] {
            render_message(&mut out, message);
        }
        out
    }

    /// Loading indicator and error banner.
    #[must_use]
    pub fn render_status(&self, manager: &ConversationManager) -> String {
        let mut out = String::new();
        if manager.is_loading() {
            out.push_str("AI is thinking...\n");
        }
        if let Some(error) = manager.error() {
            let _ = writeln!(out, "[Error] {error}");
        }
        out
    }
}

fn render_message(out: &mut String, message: &ChatMessage) {
    let label = match message.role {
        ChatRole::User => "You",
        ChatRole::Assistant => "Assistant",
        ChatRole::Error => "Error",
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");

    let _ = writeln!(out, "{label} · {time}");
    for line in message.content.lines() {
        let _ = writeln!(out, "  {line}");
    }
    if message.role == ChatRole::Assistant {
        if let Some(model) = &message.model {
            let _ = writeln!(out, "  Model: {model}");
        }
    }
    out.push('\n');
}
