//! Upstream LLM driver traits and implementations.
//!
//! This module provides the abstraction the relay endpoint uses to talk to an
//! `OpenAI`-compatible Chat Completions API (`OpenRouter` by default).
//!
//! # Overview
//!
//! The [`CompletionDriver`] trait defines the single-shot completion interface.
//! [`ChatCompletionsDriver`] is the HTTP implementation; tests substitute
//! their own drivers to observe the outbound messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use openrouter_chat_relay::llm::{ChatCompletionsDriver, LlmSettings, Provider};
//!
//! let settings = LlmSettings {
//!     base_url: "https://openrouter.ai/api".to_string(),
//!     api_key: Some("sk-or-...".to_string()),
//!     model: "z-ai/glm-4.5-air:free".to_string(),
//!     provider: Provider::OpenRouter,
//!     ..LlmSettings::default()
//! };
//! let driver = ChatCompletionsDriver::new(settings);
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use provider::Provider;

use std::time::Duration;

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "z-ai/glm-4.5-air:free";

/// Default upstream request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// LLM connection and sampling settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://openrouter.ai/api`).
    pub base_url: String,
    /// API credential. Requests fail with a configuration error when absent.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Provider type (auto-detected from `base_url`).
    pub provider: Provider,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Deadline for a single upstream call.
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            provider: Provider::OpenRouter,
            max_tokens: 1024,
            temperature: 0.7,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A message in the outbound conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content of the message.
    pub content: String,
}

impl Message {
    /// Create a system prompt message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

impl MessageRole {
    /// Parse a conversational role name. System prompts are never accepted
    /// from callers, so only `user` and `assistant` map to a role.
    #[must_use]
    pub fn from_history_role(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A completed (non-streaming) reply from the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated reply text.
    pub content: String,
    /// Model that produced the reply.
    pub model: Option<String>,
    /// Provider usage metadata, passed through untouched.
    pub usage: Option<serde_json::Value>,
}

/// Failures talking to the upstream API.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No API credential is configured.
    #[error("API key not configured")]
    MissingApiKey,

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Raw response body, for diagnostics.
        body: String,
    },

    /// The request exceeded its deadline.
    #[error("upstream request timed out")]
    Timeout,

    /// The request could not be delivered.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered 2xx but the body had no usable reply.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Trait for single-shot completion drivers.
#[async_trait::async_trait]
pub trait CompletionDriver: Send + Sync {
    /// Model identifier this driver requests.
    fn model(&self) -> &str;

    /// Request one completion for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if no credential is configured, the provider
    /// rejects the request, or the call times out or cannot be delivered.
    async fn complete(&self, messages: Vec<Message>) -> Result<Completion, LlmError>;
}
