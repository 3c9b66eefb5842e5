//! Local OpenAI-compatible server client (LM Studio and friends).

use super::{ChatCompletionsClient, CompletionRequest, LlmProvider};
use crate::Result;
use crate::config::{HttpConfig, LocalLlmConfig};

/// Client for a local OpenAI-compatible server.
///
/// No API key is sent. The server is assumed reachable; a refused
/// connection surfaces as a provider error at call time.
pub struct LocalLlmClient {
    inner: ChatCompletionsClient,
}

impl LocalLlmClient {
    /// Creates a client against the default local server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: ChatCompletionsClient::new(
                "local",
                "LOCAL_LLM_BASE",
                api_root(LocalLlmConfig::DEFAULT_BASE_URL),
                LocalLlmConfig::DEFAULT_TEXT_MODEL,
            ),
        }
    }

    /// Creates a text client from local server settings.
    #[must_use]
    pub fn from_config(config: &LocalLlmConfig, http: HttpConfig) -> Self {
        Self::new()
            .with_http_config(http)
            .with_base_url(&config.base_url)
            .with_model(&config.text_model)
    }

    /// Sets the server root; `/v1` is appended.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.inner.set_endpoint(api_root(base_url));
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

    /// Returns the `/v1` endpoint in use.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

impl Default for LocalLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for LocalLlmClient {
    fn name(&self) -> &'static str {
        "local"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.inner.complete(request, false)
    }
}

/// Appends `/v1` to a server root unless already present.
pub(crate) fn api_root(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1") {
        base.to_string()
    } else {
        format!("{base}/v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let client = LocalLlmClient::new();
        assert_eq!(client.endpoint(), "http://127.0.0.1:1234/v1");
        assert!(client.is_configured());
    }

    #[test]
    fn test_api_root() {
        assert_eq!(api_root("http://host:1234/"), "http://host:1234/v1");
        assert_eq!(api_root("http://host:1234/v1"), "http://host:1234/v1");
    }

    #[test]
    fn test_unreachable_server_is_provider_error() {
        let client = LocalLlmClient::new()
            .with_base_url("http://127.0.0.1:9")
            .with_http_config(HttpConfig {
                timeout_ms: 500,
                connect_timeout_ms: 200,
            });
        let result = client.complete(&CompletionRequest::new("hi"));
        assert!(matches!(result, Err(crate::Error::Provider { .. })));
    }
}
