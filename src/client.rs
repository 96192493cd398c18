//! HTTP client for the relay endpoint.

use crate::relay::{ChatRequest, ChatResponse, ErrorBody};

/// Fallback text when the relay fails without a usable error body.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to send message";

/// Errors returned by a [`RelayClient`].
///
/// The `Display` text is what ends up in the transcript after `Error: `.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The relay answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The relay could not be reached or its reply could not be read.
    #[error("{0}")]
    Transport(String),
}

/// Anything that can carry one chat turn to the relay.
#[async_trait::async_trait]
pub trait RelayClient: Send + Sync + std::fmt::Debug {
    /// Send a message with its trimmed history and wait for the reply.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;
}

/// [`RelayClient`] that talks to `POST /api/chat` over HTTP.
///
/// # Example
///
/// ```rust,no_run
/// use openrouter_chat_relay::client::{HttpRelayClient, RelayClient};
/// use openrouter_chat_relay::relay::ChatRequest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpRelayClient::new("http://127.0.0.1:3000");
/// let reply = client
///     .send_chat(&ChatRequest {
///         message: "Hello!".to_string(),
///         history: Vec::new(),
///     })
///     .await?;
/// println!("{}", reply.response);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRelayClient {
    /// Create a new client for the relay at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn handle_response(response: reqwest::Response) -> Result<ChatResponse, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl RelayClient for HttpRelayClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }
}
