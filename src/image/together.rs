//! Together AI image client.

use super::{
    IMAGE_SIZE, IMAGE_STEPS, ImageProvider, NEGATIVE_PROMPT, composite_prompt,
    log_ignored_base_image, require_key,
};
use crate::config::{ApiProviderConfig, HttpConfig};
use crate::llm::{build_http_client, decode_error, status_error, transport_error};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Together AI `/images/generations` client.
pub struct TogetherClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl TogetherClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.together.xyz/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "stabilityai/stable-diffusion-xl-base-1.0";

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
        client.api_key.clone_from(&config.api_key);
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

    fn request_body(&self, prompt: &str) -> GenerationRequest<'_> {
        GenerationRequest {
            model: &self.model,
            prompt: composite_prompt(prompt),
            negative_prompt: NEGATIVE_PROMPT,
            width: IMAGE_SIZE,
            height: IMAGE_SIZE,
            steps: IMAGE_STEPS,
            n: 1,
            response_format: "b64_json",
        }
    }
}

impl Default for TogetherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProvider for TogetherClient {
    fn name(&self) -> &'static str {
        "together"
    }

    fn is_configured(&self) -> bool {
        require_key("together", "TOGETHER_API_KEY", self.api_key.as_ref()).is_ok()
    }

    fn generate_composite(&self, prompt: &str, base_image: Option<&Path>) -> Result<String> {
        let api_key = require_key("together", "TOGETHER_API_KEY", self.api_key.as_ref())?;
        log_ignored_base_image("together", base_image);

        let response = self
            .client
            .post(format!("{}/images/generations", self.endpoint))
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| transport_error("together", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("together", &self.model, response));
        }

        let response: GenerationResponse = response
            .json()
            .map_err(|e| decode_error("together", &self.model, &e))?;

        response
            .data
            .into_iter()
            .find_map(|image| image.b64_json.filter(|data| !data.is_empty()))
            .ok_or_else(|| Error::provider("together", "no image data in response"))
    }
}

/// Request to the image generations API.
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: String,
    negative_prompt: &'static str,
    width: u32,
    height: u32,
    steps: u32,
    n: u32,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let client = TogetherClient::new();
        let json = serde_json::to_value(client.request_body("duck")).unwrap();
        assert_eq!(json["model"], "stabilityai/stable-diffusion-xl-base-1.0");
        assert_eq!(
            json["prompt"],
            "duck, high quality, detailed, professional, social media ready"
        );
        assert_eq!(json["width"], 1024);
        assert_eq!(json["steps"], 30);
        assert_eq!(json["n"], 1);
        assert_eq!(json["response_format"], "b64_json");
    }

    #[test]
    fn test_missing_key() {
        let client = TogetherClient::new();
        assert!(!client.is_configured());
        assert!(matches!(
            client.generate_composite("duck", None),
            Err(Error::Provider { .. })
        ));
    }

    #[test]
    fn test_response_without_image_is_empty() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"data":[{"url":"https://x"}]}"#).unwrap();
        assert!(response.data.into_iter().all(|image| image.b64_json.is_none()));
    }
}
