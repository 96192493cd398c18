//! Chat view.
//!
//! Terminal presentation over the [`ConversationManager`](crate::session::ConversationManager):
//! transcript, saved-chat sidebar, loading and error state.

pub mod terminal;
pub mod view;

pub use view::{COLLAPSED_PANEL_MESSAGES, ChatView, ViewCommand};
