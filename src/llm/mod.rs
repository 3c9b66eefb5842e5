//! LLM client abstraction.
//!
//! Provides a unified interface for the text-generation backends. Each
//! adapter only has to turn a [`CompletionRequest`] into one HTTP call;
//! reply generation is built on top of that as a provided trait method.

mod anthropic;
mod deepseek;
mod local;
mod openai;
mod openai_compat;
pub mod reply;

pub use anthropic::AnthropicClient;
pub use deepseek::DeepSeekClient;
pub use local::LocalLlmClient;
pub(crate) use local::api_root as local_api_root;
pub use openai::OpenAiClient;
pub(crate) use openai_compat::{ChatCompletionsClient, ChatMessage, ContentPart};
pub use reply::{FALLBACK_SUGGESTION, MAX_SUGGESTIONS, parse_reply_suggestions};

use crate::config::HttpConfig;
use crate::{Error, Result};
use std::time::Duration;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Optional system instruction.
    pub system: Option<String>,
    /// User message.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    /// Default token limit.
    pub const DEFAULT_MAX_TOKENS: u32 = 1024;

    /// Creates a request with a user message only.
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the token limit.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for text-generation providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Returns true if the provider has what it needs to make a call.
    ///
    /// Hosted backends return false when the API key is unset or a
    /// placeholder, so callers can skip the network entirely.
    fn is_configured(&self) -> bool {
        true
    }

    /// Runs one completion and returns the raw text content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] on missing credentials, transport
    /// failure, non-success status, or an undecodable response.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Generates up to three reply suggestions for a tweet.
    ///
    /// Never returns an empty list on success: unparseable model output
    /// yields [`FALLBACK_SUGGESTION`].
    ///
    /// # Errors
    ///
    /// Returns a generic [`Error::Provider`] if the completion fails; the
    /// original cause is logged, not retried.
    fn generate_reply(&self, tweet_text: &str, tweet_author: &str) -> Result<Vec<String>> {
        let request = reply::reply_request(tweet_text, tweet_author);
        match self.complete(&request) {
            Ok(content) => Ok(parse_reply_suggestions(&content)),
            Err(e) => {
                tracing::error!(provider = self.name(), error = %e, "Reply generation failed");
                Err(Error::provider(
                    self.name(),
                    "failed to generate reply suggestions",
                ))
            },
        }
    }
}

impl<P: LlmProvider + ?Sized> LlmProvider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request)
    }

    fn generate_reply(&self, tweet_text: &str, tweet_author: &str) -> Result<Vec<String>> {
        (**self).generate_reply(tweet_text, tweet_author)
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: HttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build provider HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Classifies a transport failure and logs it.
pub(crate) fn transport_error(provider: &'static str, model: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        provider,
        model,
        error = %e,
        error_kind,
        is_timeout = e.is_timeout(),
        is_connect = e.is_connect(),
        "Provider request failed"
    );
    Error::provider(provider, format!("{error_kind} error: {e}"))
}

/// Converts a non-success response into an error, logging the body.
pub(crate) fn status_error(
    provider: &'static str,
    model: &str,
    response: reqwest::blocking::Response,
) -> Error {
    let status = response.status();
    let body = truncate(&response.text().unwrap_or_default(), 512);
    tracing::error!(
        provider,
        model,
        status = %status,
        body = %body,
        "Provider API returned error status"
    );
    Error::provider(provider, format!("API returned status: {status} - {body}"))
}

/// Logs and wraps a response decoding failure.
pub(crate) fn decode_error(provider: &'static str, model: &str, e: &reqwest::Error) -> Error {
    tracing::error!(provider, model, error = %e, "Failed to parse provider response");
    Error::provider(provider, format!("invalid response body: {e}"))
}

/// Truncates text to at most `max` characters.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
