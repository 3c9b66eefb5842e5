//! Stability AI image client.

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

/// Stability AI v1 text-to-image client.
pub struct StabilityClient {
    api_key: Option<SecretString>,
    endpoint: String,
    engine: String,
    client: reqwest::blocking::Client,
}

impl StabilityClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.stability.ai/v1";

    /// Default engine.
    pub const DEFAULT_ENGINE: &'static str = "stable-diffusion-xl-1024-v1-0";

    /// Creates a client with no API key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            engine: Self::DEFAULT_ENGINE.to_string(),
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
        if let Some(engine) = &config.model {
            client = client.with_engine(engine);
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

    /// Sets the engine id.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    fn request_body(prompt: &str) -> TextToImageRequest {
        TextToImageRequest {
            text_prompts: vec![
                TextPrompt {
                    text: composite_prompt(prompt),
                    weight: 1.0,
                },
                TextPrompt {
                    text: NEGATIVE_PROMPT.to_string(),
                    weight: -1.0,
                },
            ],
            cfg_scale: 7.0,
            width: IMAGE_SIZE,
            height: IMAGE_SIZE,
            steps: IMAGE_STEPS,
            samples: 1,
        }
    }
}

impl Default for StabilityClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProvider for StabilityClient {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn is_configured(&self) -> bool {
        require_key("stability", "STABILITY_API_KEY", self.api_key.as_ref()).is_ok()
    }

    fn generate_composite(&self, prompt: &str, base_image: Option<&Path>) -> Result<String> {
        let api_key = require_key("stability", "STABILITY_API_KEY", self.api_key.as_ref())?;
        log_ignored_base_image("stability", base_image);

        let response = self
            .client
            .post(format!(
                "{}/generation/{}/text-to-image",
                self.endpoint, self.engine
            ))
            .bearer_auth(api_key)
            .header("Accept", "application/json")
            .json(&Self::request_body(prompt))
            .send()
            .map_err(|e| transport_error("stability", &self.engine, &e))?;

        if !response.status().is_success() {
            return Err(status_error("stability", &self.engine, response));
        }

        let response: TextToImageResponse = response
            .json()
            .map_err(|e| decode_error("stability", &self.engine, &e))?;

        response
            .artifacts
            .into_iter()
            .filter(|artifact| artifact.finish_reason.as_deref() != Some("ERROR"))
            .find_map(|artifact| artifact.base64.filter(|data| !data.is_empty()))
            .ok_or_else(|| Error::provider("stability", "no image artifacts in response"))
    }
}

#[derive(Debug, Serialize)]
struct TextToImageRequest {
    text_prompts: Vec<TextPrompt>,
    cfg_scale: f32,
    width: u32,
    height: u32,
    steps: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt {
    text: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_has_negative_prompt() {
        let json = serde_json::to_value(StabilityClient::request_body("duck")).unwrap();
        assert_eq!(json["text_prompts"][1]["text"], NEGATIVE_PROMPT);
        assert_eq!(json["text_prompts"][1]["weight"], -1.0);
        assert_eq!(json["height"], 1024);
        assert_eq!(json["samples"], 1);
    }

    #[test]
    fn test_error_artifacts_are_skipped() {
        let response: TextToImageResponse = serde_json::from_str(
            r#"{"artifacts":[{"base64":"AAA","finishReason":"ERROR"},{"base64":"BBB","finishReason":"SUCCESS"}]}"#,
        )
        .unwrap();
        let image = response
            .artifacts
            .into_iter()
            .filter(|artifact| artifact.finish_reason.as_deref() != Some("ERROR"))
            .find_map(|artifact| artifact.base64);
        assert_eq!(image.as_deref(), Some("BBB"));
    }
}
