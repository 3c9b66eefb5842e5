//! `OpenAI` image client.

use super::{IMAGE_SIZE, ImageProvider, composite_prompt, log_ignored_base_image, require_key};
use crate::config::{ApiProviderConfig, HttpConfig};
use crate::llm::{build_http_client, decode_error, status_error, transport_error};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `OpenAI` `/images/generations` client.
pub struct OpenAiImageClient {
    api_key: Option<SecretString>,
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OpenAiImageClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "dall-e-3";

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
    ///
    /// The model override is ignored: it names the chat model.
    #[must_use]
    pub fn from_config(config: &ApiProviderConfig, http: HttpConfig) -> Self {
        let mut client = Self::new().with_http_config(http);
        client.api_key.clone_from(&config.api_key);
        if let Some(base_url) = &config.base_url {
            client = client.with_endpoint(base_url.trim_end_matches('/'));
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

    fn request_body(&self, prompt: &str) -> ImageRequest<'_> {
        ImageRequest {
            model: &self.model,
            prompt: composite_prompt(prompt),
            n: 1,
            size: format!("{IMAGE_SIZE}x{IMAGE_SIZE}"),
            response_format: "b64_json",
        }
    }
}

impl Default for OpenAiImageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProvider for OpenAiImageClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        require_key("openai", "OPENAI_API_KEY", self.api_key.as_ref()).is_ok()
    }

    fn generate_composite(&self, prompt: &str, base_image: Option<&Path>) -> Result<String> {
        let api_key = require_key("openai", "OPENAI_API_KEY", self.api_key.as_ref())?;
        log_ignored_base_image("openai", base_image);

        let response = self
            .client
            .post(format!("{}/images/generations", self.endpoint))
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| transport_error("openai", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("openai", &self.model, response));
        }

        let response: ImageResponse = response
            .json()
            .map_err(|e| decode_error("openai", &self.model, &e))?;

        response
            .data
            .into_iter()
            .find_map(|image| image.b64_json.filter(|data| !data.is_empty()))
            .ok_or_else(|| Error::provider("openai", "no image data in response"))
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u32,
    size: String,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let client = OpenAiImageClient::new();
        let json = serde_json::to_value(client.request_body("duck")).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["response_format"], "b64_json");
    }

    #[test]
    fn test_from_config_keeps_image_model() {
        let config = ApiProviderConfig {
            model: Some("gpt-4o".to_string()),
            ..ApiProviderConfig::default()
        }
        .with_api_key("sk-test");
        let client = OpenAiImageClient::from_config(&config, HttpConfig::default());
        assert_eq!(client.model, "dall-e-3");
        assert!(client.is_configured());
    }
}
