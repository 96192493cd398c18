//! Conversation state and saved-session management.
//!
//! This module owns the client-side half of the application: the active
//! transcript, the collection of saved chats, and their persistence to a
//! local key/value store.
//!
//! # Architecture
//!
//! - [`ChatMessage`]: one transcript entry (`user`, `assistant` or `error`)
//! - [`ChatSession`] / [`SessionCollection`]: saved chats, newest first, capped
//! - [`LocalStorage`]: synchronous key/value backend ([`FileStorage`], [`MemoryStorage`])
//! - [`ConversationManager`]: the operations the chat view calls
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use openrouter_chat_relay::client::HttpRelayClient;
//! use openrouter_chat_relay::session::{ConversationManager, MemoryStorage};
//!
//! let relay = Arc::new(HttpRelayClient::new("http://127.0.0.1:3000"));
//! let mut manager = ConversationManager::new(Box::new(MemoryStorage::new()), relay);
//!
//! let turn = manager.begin_send("Hello!").unwrap();
//! assert_eq!(manager.messages().len(), 1);
//! assert!(manager.is_loading());
//! # drop(turn);
//! ```

mod collection;
mod manager;
mod message;
mod storage;

pub use collection::{
    ChatSession, MAX_SESSIONS, SessionCollection, TITLE_MAX_CHARS, UNTITLED, derive_title,
};
pub use manager::{ConversationManager, HISTORY_LIMIT, PendingTurn, SendRejected};
pub use message::{ChatMessage, ChatRole};
pub use storage::{
    FileStorage, LocalStorage, MemoryStorage, STORAGE_KEY, StorageError, decode_sessions,
    encode_sessions, erase_sessions, load_sessions, save_sessions,
};
