//! Conversation state manager.

use std::sync::Arc;

use crate::client::{ClientError, RelayClient};
use crate::relay::{ChatRequest, ChatResponse, HistoryEntry};

use super::collection::{ChatSession, SessionCollection};
use super::message::{ChatMessage, ChatRole};
use super::storage::{LocalStorage, erase_sessions, load_sessions, save_sessions};

/// Most recent transcript entries sent to the relay with each message.
pub const HISTORY_LIMIT: usize = 20;

/// Why a send did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejected {
    /// The input was empty or whitespace.
    #[error("message is empty")]
    EmptyInput,
    /// Another message is still waiting for its reply.
    #[error("a message is already in flight")]
    InFlight,
}

/// A started turn waiting for the relay's answer.
///
/// Returned by [`ConversationManager::begin_send`] and consumed by
/// [`ConversationManager::complete_send`].
#[derive(Debug)]
#[must_use = "a pending turn holds the send guard until completed"]
pub struct PendingTurn {
    generation: u64,
    request: ChatRequest,
}

impl PendingTurn {
    /// The request to deliver to the relay.
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Owns the active transcript, the saved sessions and their persistence.
///
/// At most one turn is in flight. Resetting or switching the active
/// conversation bumps a generation counter so a reply that arrives late is
/// dropped instead of landing in the wrong transcript.
#[derive(Debug)]
pub struct ConversationManager {
    storage: Box<dyn LocalStorage>,
    relay: Arc<dyn RelayClient>,
    sessions: SessionCollection,
    messages: Vec<ChatMessage>,
    current_chat_id: Option<String>,
    error: Option<String>,
    generation: u64,
    in_flight: Option<u64>,
}

impl ConversationManager {
    /// Create a manager, loading saved sessions from `storage`.
    ///
    /// The active conversation starts empty and unsaved.
    pub fn new(storage: Box<dyn LocalStorage>, relay: Arc<dyn RelayClient>) -> Self {
        let sessions = load_sessions(storage.as_ref());
        tracing::debug!(saved = sessions.len(), "Loaded saved chats");
        Self {
            storage,
            relay,
            sessions,
            messages: Vec::new(),
            current_chat_id: None,
            error: None,
            generation: 0,
            in_flight: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Active transcript, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Saved sessions, most recently updated first.
    pub fn sessions(&self) -> &[ChatSession] {
        self.sessions.as_slice()
    }

    /// Id of the saved session the active transcript belongs to.
    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    /// Whether a turn is waiting for the relay.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Text of the last failed turn, until the next send or navigation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Relay client this manager sends through.
    pub fn relay(&self) -> Arc<dyn RelayClient> {
        Arc::clone(&self.relay)
    }

    /// History the relay would receive for the next message.
    pub fn history_for_relay(&self) -> Vec<HistoryEntry> {
        let entries: Vec<&ChatMessage> = self
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::Error)
            .collect();
        let skip = entries.len().saturating_sub(HISTORY_LIMIT);

        entries
            .into_iter()
            .skip(skip)
            .map(|m| HistoryEntry {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sending
    // ─────────────────────────────────────────────────────────────────────────

    /// Send `text` and wait for the reply.
    ///
    /// Failures never surface here: they become an error entry in the
    /// transcript. Only a send that could not start is reported.
    pub async fn send_message(&mut self, text: &str) -> Result<(), SendRejected> {
        let turn = self.begin_send(text)?;
        let relay = self.relay();
        let result = relay.send_chat(turn.request()).await;
        self.complete_send(turn, result);
        Ok(())
    }

    /// Start a turn: append the user message and take the send guard.
    ///
    /// The returned request carries the history as it was *before* this
    /// message.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingTurn, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::EmptyInput);
        }
        if self.in_flight.is_some() {
            tracing::debug!("Send rejected: a message is already in flight");
            return Err(SendRejected::InFlight);
        }

        self.error = None;
        let history = self.history_for_relay();
        self.messages.push(ChatMessage::user(text));
        self.in_flight = Some(self.generation);

        tracing::debug!(
            history_len = history.len(),
            chat_id = ?self.current_chat_id,
            "Message sent to relay"
        );

        Ok(PendingTurn {
            generation: self.generation,
            request: ChatRequest {
                message: text.to_string(),
                history,
            },
        })
    }

    /// Finish a turn with the relay's result and persist the conversation.
    ///
    /// Returns `false` when the turn is stale (the active conversation changed
    /// since it began) and nothing was applied.
    pub fn complete_send(
        &mut self,
        turn: PendingTurn,
        result: Result<ChatResponse, ClientError>,
    ) -> bool {
        if self.in_flight != Some(turn.generation) {
            tracing::debug!(
                generation = turn.generation,
                "Dropping reply for a conversation that is no longer active"
            );
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(reply) => {
                self.messages
                    .push(ChatMessage::assistant(reply.response, reply.model));
            }
            Err(err) => {
                tracing::warn!(name: "chat.turn.failed", error = %err, "Chat error");
                let reason = err.to_string();
                self.messages.push(ChatMessage::error(&reason));
                self.error = Some(reason);
            }
        }

        self.persist_active();
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// Save the active conversation (if any) and start an empty one.
    pub fn new_chat(&mut self) {
        if !self.messages.is_empty() {
            self.persist_active();
        }
        self.reset_active();
    }

    /// Make a saved session active. Unknown ids are ignored.
    ///
    /// A transcript with a turn still in flight is saved before switching,
    /// as [`new_chat`](Self::new_chat) does.
    ///
    /// Returns whether the session was found.
    pub fn load_chat(&mut self, id: &str) -> bool {
        let Some(session) = self.sessions.get(id) else {
            tracing::debug!(chat_id = %id, "Chat not found");
            return false;
        };
        let messages = session.messages.clone();

        // Completed turns are already saved; only an in-flight one is not.
        if self.in_flight.is_some() {
            self.persist_active();
        }
        self.release_turn();
        self.messages = messages;
        self.current_chat_id = Some(id.to_string());
        self.error = None;
        true
    }

    /// Delete a saved session; deleting the active one resets to an empty chat.
    ///
    /// Returns whether the session existed.
    pub fn delete_chat(&mut self, id: &str) -> bool {
        let removed = self.sessions.remove(id);
        if removed {
            save_sessions(self.storage.as_ref(), &self.sessions);
        }
        if self.current_chat_id.as_deref() == Some(id) {
            self.reset_active();
        }
        removed
    }

    /// Delete every saved session and erase the stored blob.
    pub fn clear_all_chats(&mut self) {
        self.sessions.clear();
        erase_sessions(self.storage.as_ref());
        self.reset_active();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot the active transcript into the collection and write it out.
    fn persist_active(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        let id = self
            .current_chat_id
            .get_or_insert_with(ChatSession::generate_id)
            .clone();

        if let Some(evicted) = self
            .sessions
            .upsert(ChatSession::new(id, self.messages.clone()))
        {
            tracing::debug!(chat_id = %evicted.id, "Evicted oldest saved chat");
        }
        save_sessions(self.storage.as_ref(), &self.sessions);
    }

    fn reset_active(&mut self) {
        self.release_turn();
        self.messages.clear();
        self.current_chat_id = None;
        self.error = None;
    }

    /// Invalidate any pending turn and free the send guard.
    fn release_turn(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::{MemoryStorage, STORAGE_KEY};

    /// Relay that must never be called; these tests drive the two phases by hand.
    #[derive(Debug)]
    struct NoRelay;

    #[async_trait::async_trait]
    impl RelayClient for NoRelay {
        async fn send_chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ClientError> {
            Err(ClientError::Transport("unreachable".to_string()))
        }
    }

    fn manager_with(storage: &MemoryStorage) -> ConversationManager {
        ConversationManager::new(Box::new(storage.clone()), Arc::new(NoRelay))
    }

    fn reply(text: &str) -> Result<ChatResponse, ClientError> {
        Ok(ChatResponse {
            response: text.to_string(),
            usage: None,
            model: Some("test-model".to_string()),
            success: true,
        })
    }

    fn turn(manager: &mut ConversationManager, text: &str, answer: &str) {
        let pending = manager.begin_send(text).unwrap();
        assert!(manager.complete_send(pending, reply(answer)));
    }

    #[test]
    fn test_begin_send_appends_user_message_immediately() {
        let mut manager = manager_with(&MemoryStorage::new());
        let pending = manager.begin_send("hello").unwrap();

        assert_eq!(manager.messages().len(), 1);
        assert_eq!(manager.messages()[0].role, ChatRole::User);
        assert!(manager.is_loading());
        assert!(pending.request().history.is_empty());
        assert_eq!(pending.request().message, "hello");
    }

    #[test]
    fn test_blank_input_is_rejected() {
        let mut manager = manager_with(&MemoryStorage::new());
        assert_eq!(
            manager.begin_send("   \n").unwrap_err(),
            SendRejected::EmptyInput
        );
        assert!(manager.messages().is_empty());
    }

    #[test]
    fn test_second_send_rejected_while_in_flight() {
        let mut manager = manager_with(&MemoryStorage::new());
        let pending = manager.begin_send("first").unwrap();

        assert_eq!(
            manager.begin_send("second").unwrap_err(),
            SendRejected::InFlight
        );
        assert_eq!(manager.messages().len(), 1);

        manager.complete_send(pending, reply("ok"));
        assert!(!manager.is_loading());
        assert!(manager.begin_send("second").is_ok());
    }

    #[test]
    fn test_history_excludes_errors_and_is_capped() {
        let mut manager = manager_with(&MemoryStorage::new());
        for i in 0..12 {
            turn(&mut manager, &format!("q{i}"), &format!("a{i}"));
        }
        let pending = manager.begin_send("bad").unwrap();
        manager.complete_send(pending, Err(ClientError::Transport("down".into())));

        let history = manager.history_for_relay();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert!(history.iter().all(|h| h.role != "error"));
        assert_eq!(history.last().unwrap().content, "bad");
        assert_eq!(history[0].content, "a2");
    }

    #[test]
    fn test_failure_appends_error_and_persists() {
        let storage = MemoryStorage::new();
        let mut manager = manager_with(&storage);

        let pending = manager.begin_send("hello").unwrap();
        let failure = ClientError::Api {
            status: 429,
            message: "Rate limit exceeded. Please try again later.".to_string(),
        };
        manager.complete_send(pending, Err(failure));

        let last = manager.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Error);
        assert_eq!(
            last.content,
            "Error: Rate limit exceeded. Please try again later."
        );
        assert_eq!(
            manager.error(),
            Some("Rate limit exceeded. Please try again later.")
        );
        assert!(!manager.is_loading());
        assert_eq!(manager.sessions().len(), 1);
        assert!(storage.get_item(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_next_send_clears_error_flag() {
        let mut manager = manager_with(&MemoryStorage::new());
        let pending = manager.begin_send("one").unwrap();
        manager.complete_send(pending, Err(ClientError::Transport("down".into())));
        assert!(manager.error().is_some());

        let _pending = manager.begin_send("two").unwrap();
        assert!(manager.error().is_none());
    }

    #[test]
    fn test_first_turn_creates_titled_session() {
        let mut manager = manager_with(&MemoryStorage::new());
        turn(&mut manager, "What is the capital of Australia, roughly?", "Canberra");

        let session = &manager.sessions()[0];
        assert_eq!(Some(session.id.as_str()), manager.current_chat_id());
        assert_eq!(session.title, "What is the capital of Austral");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].model.as_deref(), Some("test-model"));
    }

    #[test]
    fn test_new_chat_then_load_restores_transcript() {
        let mut manager = manager_with(&MemoryStorage::new());
        turn(&mut manager, "hello", "hi there");
        turn(&mut manager, "how are you", "fine");
        let saved = manager.messages().to_vec();
        let id = manager.current_chat_id().unwrap().to_string();

        manager.new_chat();
        assert!(manager.messages().is_empty());
        assert!(manager.current_chat_id().is_none());

        assert!(manager.load_chat(&id));
        assert_eq!(manager.messages(), saved.as_slice());
        assert_eq!(manager.current_chat_id(), Some(id.as_str()));
    }

    #[test]
    fn test_new_chat_saves_pending_transcript() {
        let mut manager = manager_with(&MemoryStorage::new());
        let _pending = manager.begin_send("unanswered").unwrap();

        manager.new_chat();
        assert_eq!(manager.sessions().len(), 1);
        assert_eq!(manager.sessions()[0].title, "unanswered");
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_load_chat_saves_pending_transcript() {
        let mut manager = manager_with(&MemoryStorage::new());
        turn(&mut manager, "older chat", "ok");
        let older = manager.current_chat_id().unwrap().to_string();

        manager.new_chat();
        let pending = manager.begin_send("unanswered").unwrap();

        assert!(manager.load_chat(&older));
        assert_eq!(manager.sessions().len(), 2);
        assert!(
            manager
                .sessions()
                .iter()
                .any(|s| s.title == "unanswered" && s.messages.len() == 1)
        );
        assert!(!manager.is_loading());
        assert!(!manager.complete_send(pending, reply("late")));
        assert_eq!(manager.messages()[0].content, "older chat");
    }

    #[test]
    fn test_load_unknown_chat_is_noop() {
        let mut manager = manager_with(&MemoryStorage::new());
        turn(&mut manager, "hello", "hi");
        let before = manager.messages().to_vec();

        assert!(!manager.load_chat("missing"));
        assert_eq!(manager.messages(), before.as_slice());
    }

    #[test]
    fn test_stale_reply_after_new_chat_is_dropped() {
        let mut manager = manager_with(&MemoryStorage::new());
        let pending = manager.begin_send("hello").unwrap();

        manager.new_chat();
        assert!(!manager.complete_send(pending, reply("late")));
        assert!(manager.messages().is_empty());
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_delete_active_resets_but_other_keeps_transcript() {
        let mut manager = manager_with(&MemoryStorage::new());
        turn(&mut manager, "first chat", "a");
        let first = manager.current_chat_id().unwrap().to_string();
        manager.new_chat();
        turn(&mut manager, "second chat", "b");
        let second = manager.current_chat_id().unwrap().to_string();

        assert!(manager.delete_chat(&first));
        assert_eq!(manager.messages().len(), 2);
        assert_eq!(manager.current_chat_id(), Some(second.as_str()));

        assert!(manager.delete_chat(&second));
        assert!(manager.messages().is_empty());
        assert!(manager.current_chat_id().is_none());
        assert!(manager.sessions().is_empty());
    }

    #[test]
    fn test_clear_all_erases_storage() {
        let storage = MemoryStorage::new();
        let mut manager = manager_with(&storage);
        turn(&mut manager, "hello", "hi");
        manager.new_chat();
        turn(&mut manager, "again", "hi");

        manager.clear_all_chats();
        assert!(manager.sessions().is_empty());
        assert!(manager.messages().is_empty());
        assert!(storage.get_item(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_collection_capped_at_twenty() {
        let mut manager = manager_with(&MemoryStorage::new());
        turn(&mut manager, "chat 0", "ok");
        let oldest = manager.current_chat_id().unwrap().to_string();
        for i in 1..=20 {
            manager.new_chat();
            turn(&mut manager, &format!("chat {i}"), "ok");
        }

        assert_eq!(manager.sessions().len(), 20);
        assert!(!manager.load_chat(&oldest));
        assert_eq!(manager.sessions()[0].title, "chat 20");
    }

    #[test]
    fn test_sessions_survive_restart() {
        let storage = MemoryStorage::new();
        let mut manager = manager_with(&storage);
        turn(&mut manager, "persist me", "done");
        let id = manager.current_chat_id().unwrap().to_string();
        let saved = manager.messages().to_vec();
        drop(manager);

        let mut restarted = manager_with(&storage);
        assert!(restarted.messages().is_empty());
        assert!(restarted.load_chat(&id));
        assert_eq!(restarted.messages(), saved.as_slice());
    }

    #[test]
    fn test_malformed_storage_starts_empty() {
        let storage = MemoryStorage::new();
        storage.set_item(STORAGE_KEY, "[{\"id\": 1}]").unwrap();
        let manager = manager_with(&storage);
        assert!(manager.sessions().is_empty());
    }
}
