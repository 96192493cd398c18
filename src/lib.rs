//! OpenRouter Chat Relay
//!
//! A chat client that forwards user messages to an `OpenAI`-compatible
//! completion endpoint and keeps a local, multi-session conversation history.
//!
//! # Architecture
//!
//! - **Relay**: Axum HTTP endpoint (`POST /api/chat`) in front of the upstream API
//! - **Conversation State Manager**: message log, saved sessions, local persistence
//! - **Chat View**: terminal presentation over the state manager
//!
//! # Modules
//!
//! - [`llm`]: upstream completion driver and provider detection
//! - [`relay`]: the `/api/chat` handler and its error taxonomy
//! - [`server`]: router assembly and server startup
//! - [`client`]: HTTP client for the relay endpoint
//! - [`session`]: conversation state, session collection and storage
//! - [`ui`]: chat view rendering and the interactive terminal loop

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod client;
pub mod config;
pub mod llm;
pub mod relay;
pub mod server;
pub mod session;
pub mod ui;

use llm::CompletionDriver;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upstream completion driver.
    pub llm: Arc<dyn CompletionDriver>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("model", &self.llm.model())
            .finish()
    }
}
