//! `OpenAI` Chat Completions API driver.
//!
//! This module implements the [`CompletionDriver`] trait for the Chat
//! Completions API (`/v1/chat/completions`) with a single, non-streaming
//! request per call.

use serde::Deserialize;

use super::{Completion, CompletionDriver, LlmError, LlmSettings, Message};

/// Driver for the `OpenAI` Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait::async_trait]
impl CompletionDriver for ChatCompletionsDriver {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<Completion, LlmError> {
        let Some(api_key) = &self.settings.api_key else {
            return Err(LlmError::MissingApiKey);
        };

        let url = self
            .settings
            .provider
            .build_chat_url(&self.settings.base_url);

        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        });

        tracing::debug!(
            url = %url,
            model = %self.settings.model,
            message_count = messages.len(),
            "Sending completion request"
        );

        let mut rb = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.settings.timeout)
            .json(&body);
        for (name, value) in self.settings.provider.attribution_headers() {
            rb = rb.header(*name, *value);
        }

        let resp = rb.send().await.map_err(classify)?;
        let status = resp.status();
        let text = resp.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_completion(&text, &self.settings.model)
    }
}

/// Wire shape of a non-streaming completion response.
#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extract the first choice's text from a completion body.
fn parse_completion(text: &str, fallback_model: &str) -> Result<Completion, LlmError> {
    let body: CompletionBody =
        serde_json::from_str(text).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))?;

    Ok(Completion {
        content,
        model: body.model.or_else(|| Some(fallback_model.to_string())),
        usage: body.usage.filter(|u| !u.is_null()),
    })
}

/// Sort a transport failure into timeout or network.
fn classify(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err.to_string())
    }
}
