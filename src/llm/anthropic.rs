//! Anthropic Claude client.

use super::{
    CompletionRequest, LlmProvider, build_http_client, decode_error, status_error,
    transport_error,
};
use crate::config::{ApiProviderConfig, HttpConfig, is_placeholder_key};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Anthropic Messages API client.
pub struct AnthropicClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "claude-3-5-haiku-latest";

    /// API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Creates a client with no API key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(HttpConfig::default()),
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
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Validates that the client has a plausible API key.
    fn validate(&self) -> Result<&str> {
        let key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !is_placeholder_key(key))
            .ok_or_else(|| Error::provider("anthropic", "ANTHROPIC_API_KEY not set"))?;

        if !Self::is_valid_api_key_format(key) {
            return Err(Error::provider(
                "anthropic",
                "invalid API key format: expected 'sk-ant-' prefix",
            ));
        }
        Ok(key)
    }

    /// Checks the `sk-ant-` prefix and character set.
    ///
    /// Catches malformed keys before a request that would fail with 401.
    fn is_valid_api_key_format(key: &str) -> bool {
        const PREFIX: &str = "sk-ant-";

        key.starts_with(PREFIX)
            && key.len() > PREFIX.len()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self.validate()?;

        tracing::debug!(provider = "anthropic", model = %self.model, "Sending messages request");

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| transport_error("anthropic", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("anthropic", &self.model, response));
        }

        let response: MessagesResponse = response
            .json()
            .map_err(|e| decode_error("anthropic", &self.model, &e))?;

        response
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text)
            .ok_or_else(|| Error::provider("anthropic", "no text content in response"))
    }
}

/// Request to the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

/// A message in the conversation.
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// A content block in the response.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_configuration() {
        let client = AnthropicClient::new()
            .with_api_key("sk-ant-api03-test")
            .with_endpoint("https://custom.endpoint")
            .with_model("claude-3-opus");

        assert!(client.is_configured());
        assert_eq!(client.endpoint, "https://custom.endpoint");
        assert_eq!(client.model, "claude-3-opus");
    }

    #[test]
    fn test_validate_no_key() {
        let client = AnthropicClient::new();
        assert!(!client.is_configured());
        let err = client.complete(&CompletionRequest::new("hi")).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY not set"));
    }

    #[test]
    fn test_validate_bad_format() {
        let client = AnthropicClient::new().with_api_key("sk-openai-style");
        let err = client.complete(&CompletionRequest::new("hi")).unwrap_err();
        assert!(err.to_string().contains("sk-ant-"));
    }

    #[test]
    fn test_key_format() {
        assert!(AnthropicClient::is_valid_api_key_format("sk-ant-api03-abc_DEF"));
        assert!(!AnthropicClient::is_valid_api_key_format("sk-ant-"));
        assert!(!AnthropicClient::is_valid_api_key_format("sk-ant-api03 with space"));
    }

    #[test]
    fn test_request_serialization() {
        let body = MessagesRequest {
            model: "claude",
            max_tokens: 100,
            temperature: 0.3,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
