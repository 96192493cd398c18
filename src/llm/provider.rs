//! Provider-specific configuration and detection.
//!
//! This module handles the small differences between `OpenAI`-compatible
//! providers: URL layout and attribution headers.

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Together AI (together.ai, together.xyz)
    TogetherAI,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use openrouter_chat_relay::llm::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://openrouter.ai/api");
    /// assert_eq!(provider, Provider::OpenRouter);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("together.ai") || lower.contains("together.xyz") {
            Self::TogetherAI
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Build the chat completions URL for this provider.
    ///
    /// A base URL that already ends in `/v1` is not given a second one.
    #[must_use]
    pub fn build_chat_url(self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::Groq if !base.ends_with("/openai/v1") && !base.ends_with("/v1") => {
                format!("{base}/openai/v1/chat/completions")
            }
            _ if base.ends_with("/v1") => format!("{base}/chat/completions"),
            _ => format!("{base}/v1/chat/completions"),
        }
    }

    /// Extra headers the provider uses for app attribution.
    #[must_use]
    pub fn attribution_headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::OpenRouter => &[("X-Title", "OpenRouter Chat Relay")],
            _ => &[],
        }
    }
}
