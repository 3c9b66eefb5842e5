//! `OpenAI` client.

use super::{ChatCompletionsClient, CompletionRequest, LlmProvider};
use crate::Result;
use crate::config::{ApiProviderConfig, HttpConfig};

/// `OpenAI` chat client.
pub struct OpenAiClient {
    inner: ChatCompletionsClient,
}

impl OpenAiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Creates a client with no API key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ChatCompletionsClient::new(
                "openai",
                "OPENAI_API_KEY",
                Self::DEFAULT_ENDPOINT,
                Self::DEFAULT_MODEL,
            ),
        }
    }

    /// Creates a client from provider settings.
    #[must_use]
    pub fn from_config(config: &ApiProviderConfig, http: HttpConfig) -> Self {
        let mut client = Self::new().with_http_config(http);
        if let Some(key) = config.api_key() {
            client = client.with_api_key(key);
        }
        if let Some(base_url) = &config.base_url {
            client = client.with_endpoint(base_url.trim_end_matches('/'));
        }
        if let Some(model) = &config.model {
            client = client.with_model(model);
        }
        client
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.inner.set_api_key(key);
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.inner.set_endpoint(endpoint);
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.inner.set_model(model);
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.inner.set_http_config(config);
        self
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.inner.has_api_key()
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.inner.complete(request, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_configuration() {
        let client = OpenAiClient::new()
            .with_api_key("sk-test")
            .with_endpoint("https://custom.endpoint")
            .with_model("gpt-4");

        assert!(client.is_configured());
        assert_eq!(client.inner.endpoint(), "https://custom.endpoint");
        assert_eq!(client.inner.model(), "gpt-4");
    }

    #[test]
    fn test_validate_no_key() {
        let err = OpenAiClient::new()
            .complete(&CompletionRequest::new("hi"))
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY not set"));
    }
}
