//! Replicate image client.
//!
//! Replicate answers with output URLs rather than image bytes, so the
//! client downloads the first image and base64-encodes it.

use super::{
    IMAGE_SIZE, IMAGE_STEPS, ImageProvider, NEGATIVE_PROMPT, composite_prompt, path_to_data_url,
    require_key,
};
use crate::config::{ApiProviderConfig, HttpConfig};
use crate::llm::{build_http_client, decode_error, status_error, transport_error, truncate};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Replicate predictions client.
pub struct ReplicateClient {
    api_key: Option<SecretString>,
    endpoint: String,
    version: String,
    poll_interval: Duration,
    poll_timeout: Duration,
    client: reqwest::blocking::Client,
}

impl ReplicateClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.replicate.com/v1";

    /// SDXL model version.
    pub const DEFAULT_VERSION: &'static str =
        "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";

    /// Classifier-free guidance scale.
    const GUIDANCE_SCALE: f32 = 7.5;

    /// Creates a client with no API key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            version: Self::DEFAULT_VERSION.to_string(),
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(120),
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
        if let Some(version) = &config.model {
            client = client.with_version(version);
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

    /// Sets the model version hash.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Sets how long to wait for a prediction that outlives `Prefer: wait`.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    fn prediction_body(&self, prompt: &str, image: Option<String>) -> Value {
        let mut input = json!({
            "prompt": composite_prompt(prompt),
            "negative_prompt": NEGATIVE_PROMPT,
            "width": IMAGE_SIZE,
            "height": IMAGE_SIZE,
            "num_outputs": 1,
            "num_inference_steps": IMAGE_STEPS,
            "guidance_scale": Self::GUIDANCE_SCALE,
        });
        if let (Some(image), Some(obj)) = (image, input.as_object_mut()) {
            obj.insert("image".to_string(), Value::String(image));
        }
        json!({
            "version": self.version,
            "input": input,
        })
    }

    fn poll_prediction(&self, poll_url: &str, api_key: &str) -> Result<Value> {
        let started = Instant::now();
        loop {
            let response = self
                .client
                .get(poll_url)
                .bearer_auth(api_key)
                .send()
                .map_err(|e| transport_error("replicate", &self.version, &e))?;
            if !response.status().is_success() {
                return Err(status_error("replicate", &self.version, response));
            }
            let prediction: Value = response
                .json()
                .map_err(|e| decode_error("replicate", &self.version, &e))?;

            match prediction_status(&prediction).as_str() {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => {
                    return Err(Error::provider(
                        "replicate",
                        format!("prediction failed: {}", truncate(&prediction.to_string(), 512)),
                    ));
                },
                _ => {},
            }
            if started.elapsed() >= self.poll_timeout {
                return Err(Error::provider(
                    "replicate",
                    format!("polling timed out after {}s", self.poll_timeout.as_secs()),
                ));
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| transport_error("replicate", &self.version, &e))?;
        if !response.status().is_success() {
            return Err(status_error("replicate", &self.version, response));
        }
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| decode_error("replicate", &self.version, &e))
    }
}

impl Default for ReplicateClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProvider for ReplicateClient {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn is_configured(&self) -> bool {
        require_key("replicate", "REPLICATE_API_KEY", self.api_key.as_ref()).is_ok()
    }

    fn generate_composite(&self, prompt: &str, base_image: Option<&Path>) -> Result<String> {
        let api_key = require_key("replicate", "REPLICATE_API_KEY", self.api_key.as_ref())?;
        let image = base_image.map(path_to_data_url).transpose()?;

        let response = self
            .client
            .post(format!("{}/predictions", self.endpoint))
            .bearer_auth(api_key)
            .header("Prefer", "wait")
            .json(&self.prediction_body(prompt, image))
            .send()
            .map_err(|e| transport_error("replicate", &self.version, &e))?;

        if !response.status().is_success() {
            return Err(status_error("replicate", &self.version, response));
        }

        let mut prediction: Value = response
            .json()
            .map_err(|e| decode_error("replicate", &self.version, &e))?;

        let status = prediction_status(&prediction);
        if status != "succeeded" {
            if !matches!(status.as_str(), "starting" | "processing") {
                return Err(Error::provider(
                    "replicate",
                    format!("prediction failed with status '{status}'"),
                ));
            }
            let poll_url = prediction
                .pointer("/urls/get")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::provider("replicate", "prediction missing poll URL"))?;
            tracing::debug!(provider = "replicate", status = %status, "Polling prediction");
            prediction = self.poll_prediction(&poll_url, api_key)?;
        }

        let mut urls = Vec::new();
        if let Some(output) = prediction.get("output") {
            extract_output_urls(output, &mut urls);
        }
        let url = urls
            .first()
            .ok_or_else(|| Error::provider("replicate", "no image generated"))?;

        let bytes = self.download_image(url)?;
        if bytes.is_empty() {
            return Err(Error::provider("replicate", "downloaded image is empty"));
        }
        Ok(BASE64.encode(bytes))
    }
}

fn prediction_status(prediction: &Value) -> String {
    prediction
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Collects unique `http` URLs from a prediction output value.
fn extract_output_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
                out.push(trimmed.to_string());
            }
        },
        Value::Array(rows) => {
            for row in rows {
                extract_output_urls(row, out);
            }
        },
        Value::Object(obj) => {
            for key in ["url", "urls", "output"] {
                if let Some(inner) = obj.get(key) {
                    extract_output_urls(inner, out);
                }
            }
        },
        _ => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_output_urls() {
        let output = json!([
            "https://replicate.delivery/a.png",
            {"url": "https://replicate.delivery/b.png"},
            "https://replicate.delivery/a.png",
            "not-a-url",
            42
        ]);
        let mut urls = Vec::new();
        extract_output_urls(&output, &mut urls);
        assert_eq!(
            urls,
            vec![
                "https://replicate.delivery/a.png",
                "https://replicate.delivery/b.png"
            ]
        );
    }

    #[test]
    fn test_prediction_body() {
        let client = ReplicateClient::new();
        let body = client.prediction_body("duck", None);
        assert_eq!(body["version"], ReplicateClient::DEFAULT_VERSION);
        assert_eq!(body["input"]["num_inference_steps"], 30);
        assert_eq!(body["input"]["guidance_scale"], 7.5);
        assert!(body["input"].get("image").is_none());

        let body = client.prediction_body("duck", Some("data:image/png;base64,AA".to_string()));
        assert_eq!(body["input"]["image"], "data:image/png;base64,AA");
    }

    #[test]
    fn test_prediction_status_is_lowercased() {
        assert_eq!(prediction_status(&json!({"status": "Succeeded"})), "succeeded");
        assert_eq!(prediction_status(&json!({})), "");
    }

    #[test]
    fn test_missing_key() {
        let client = ReplicateClient::new();
        assert!(!client.is_configured());
        let err = client.generate_composite("duck", None).unwrap_err();
        assert!(err.to_string().contains("REPLICATE_API_KEY not set"));
    }
}
