//! Chat Completions transport shared by OpenAI-compatible backends.

use super::{CompletionRequest, decode_error, status_error, transport_error};
use crate::config::{HttpConfig, is_placeholder_key};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Blocking client for a `/chat/completions` endpoint.
pub struct ChatCompletionsClient {
    provider: &'static str,
    key_var: &'static str,
    api_key: Option<SecretString>,
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl ChatCompletionsClient {
    /// Creates a client for `provider` against `endpoint` (ending in `/v1`).
    ///
    /// `key_var` names the credential in error messages.
    pub fn new(
        provider: &'static str,
        key_var: &'static str,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            key_var,
            api_key: None,
            endpoint: endpoint.into(),
            model: model.into(),
            client: super::build_http_client(HttpConfig::default()),
        }
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(SecretString::from(key.into()));
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn set_http_config(&mut self, config: HttpConfig) {
        self.client = super::build_http_client(config);
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the usable API key, skipping placeholders.
    fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !is_placeholder_key(key))
    }

    /// Returns true if a real API key is set.
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Checks if the model takes `max_completion_tokens` and a fixed temperature.
    fn is_reasoning_model(&self) -> bool {
        self.model.starts_with("gpt-5")
            || self.model.starts_with("o1")
            || self.model.starts_with("o3")
    }

    /// Sends a completion request built from system and user text.
    pub fn complete(&self, request: &CompletionRequest, require_key: bool) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage::text("system", system.clone()));
        }
        messages.push(ChatMessage::text("user", request.user.clone()));
        self.chat(messages, request.temperature, request.max_tokens, require_key)
    }

    /// Sends raw chat messages and returns the first choice's content.
    pub fn chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
        require_key: bool,
    ) -> Result<String> {
        let api_key = self.api_key();
        if require_key && api_key.is_none() {
            return Err(Error::provider(
                self.provider,
                format!("{} not set", self.key_var),
            ));
        }

        let body = if self.is_reasoning_model() {
            ChatCompletionRequest {
                model: &self.model,
                messages,
                max_tokens: None,
                max_completion_tokens: Some(max_tokens),
                temperature: None,
                stream: false,
            }
        } else {
            ChatCompletionRequest {
                model: &self.model,
                messages,
                max_tokens: Some(max_tokens),
                max_completion_tokens: None,
                temperature: Some(temperature),
                stream: false,
            }
        };

        tracing::debug!(
            provider = self.provider,
            model = %self.model,
            endpoint = %self.endpoint,
            "Sending chat completion request"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .map_err(|e| transport_error(self.provider, &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error(self.provider, &self.model, response));
        }

        let response: ChatCompletionResponse = response
            .json()
            .map_err(|e| decode_error(self.provider, &self.model, &e))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| Error::provider(self.provider, "no choices in response"))
    }
}

/// Request body for the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// A message in the chat.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

impl ChatMessage {
    /// A plain-text message.
    pub fn text(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// A multi-part message, used for image input.
    pub fn parts(role: &'static str, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message content: a string or a list of typed parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// An image part from a URL or data URL.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// Image reference inside a content part.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails_before_network() {
        let client =
            ChatCompletionsClient::new("deepseek", "DEEPSEEK_API_KEY", "http://127.0.0.1:9", "m");
        let err = client
            .complete(&CompletionRequest::new("hi"), true)
            .unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_API_KEY not set"));
    }

    #[test]
    fn test_placeholder_key_counts_as_missing() {
        let mut client =
            ChatCompletionsClient::new("deepseek", "DEEPSEEK_API_KEY", "http://127.0.0.1:9", "m");
        client.set_api_key("your-deepseek-api-key-here");
        assert!(!client.has_api_key());
        client.set_api_key("sk-live");
        assert!(client.has_api_key());
    }

    #[test]
    fn test_reasoning_model_detection() {
        let mut client = ChatCompletionsClient::new("openai", "OPENAI_API_KEY", "x", "gpt-4o-mini");
        assert!(!client.is_reasoning_model());
        client.set_model("o3-mini");
        assert!(client.is_reasoning_model());
    }

    #[test]
    fn test_multipart_message_serialization() {
        let message = ChatMessage::parts(
            "user",
            vec![
                ContentPart::Text {
                    text: "describe".to_string(),
                },
                ContentPart::image_url("data:image/png;base64,AAAA"),
            ],
        );
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_text_message_serializes_as_string() {
        let json = serde_json::to_value(ChatMessage::text("system", "be brief")).unwrap();
        assert_eq!(json["content"], "be brief");
        assert_eq!(json["role"], "system");
    }
}
