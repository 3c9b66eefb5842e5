//! Provider credentials and endpoints.

use super::env_var;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Returns true if an API key is empty or a template placeholder such as
/// `your-deepseek-api-key-here`.
#[must_use]
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty()
        || (key.starts_with("your-") && key.ends_with("-here"))
        || key.eq_ignore_ascii_case("changeme")
}

/// Credentials and overrides for a hosted API backend.
#[derive(Debug, Clone, Default)]
pub struct ApiProviderConfig {
    /// API key.
    pub api_key: Option<SecretString>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Model override.
    pub model: Option<String>,
}

impl ApiProviderConfig {
    /// Returns the API key if it is set and not a placeholder.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !is_placeholder_key(key))
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn merge(&mut self, file: ConfigFileApiProvider) {
        if let Some(key) = file.api_key {
            self.api_key = Some(SecretString::from(key));
        }
        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if file.model.is_some() {
            self.model = file.model;
        }
    }

    fn env_override(&mut self, key_var: &str, base_var: Option<&str>) {
        if let Some(key) = env_var(key_var) {
            self.api_key = Some(SecretString::from(key));
        }
        if let Some(base) = base_var.and_then(env_var) {
            self.base_url = Some(base);
        }
    }
}

/// Settings for the local OpenAI-compatible server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLlmConfig {
    /// Server root, without the `/v1` suffix.
    pub base_url: String,
    /// Model used for text completions.
    pub text_model: String,
    /// Model used for image analysis.
    pub vision_model: String,
}

impl LocalLlmConfig {
    /// Default server root.
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:1234";
    /// Default text model.
    pub const DEFAULT_TEXT_MODEL: &'static str = "openai/gpt-oss-20b";
    /// Default vision model.
    pub const DEFAULT_VISION_MODEL: &'static str = "moondream-2b-2025-04-14";
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            text_model: Self::DEFAULT_TEXT_MODEL.to_string(),
            vision_model: Self::DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

/// Credentials for every backend the factory can build.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// `DeepSeek`.
    pub deepseek: ApiProviderConfig,
    /// `OpenAI` (text, images, and vision).
    pub openai: ApiProviderConfig,
    /// Anthropic.
    pub anthropic: ApiProviderConfig,
    /// Together AI.
    pub together: ApiProviderConfig,
    /// Stability AI.
    pub stability: ApiProviderConfig,
    /// Replicate.
    pub replicate: ApiProviderConfig,
    /// Local OpenAI-compatible server.
    pub local: LocalLlmConfig,
}

impl ProviderSettings {
    pub(super) fn from_config_file(file: ConfigFileProviders) -> Self {
        let mut settings = Self::default();
        let sections = [
            (file.deepseek, &mut settings.deepseek),
            (file.openai, &mut settings.openai),
            (file.anthropic, &mut settings.anthropic),
            (file.together, &mut settings.together),
            (file.stability, &mut settings.stability),
            (file.replicate, &mut settings.replicate),
        ];
        for (section, target) in sections {
            if let Some(section) = section {
                target.merge(section);
            }
        }
        if let Some(local) = file.local {
            if let Some(base_url) = local.base_url {
                settings.local.base_url = base_url;
            }
            if let Some(text_model) = local.text_model {
                settings.local.text_model = text_model;
            }
            if let Some(vision_model) = local.vision_model {
                settings.local.vision_model = vision_model;
            }
        }
        settings
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.deepseek
            .env_override("DEEPSEEK_API_KEY", Some("DEEPSEEK_API_BASE"));
        self.openai.env_override("OPENAI_API_KEY", Some("OPENAI_API_BASE"));
        self.anthropic.env_override("ANTHROPIC_API_KEY", None);
        self.together.env_override("TOGETHER_API_KEY", None);
        self.stability.env_override("STABILITY_API_KEY", None);
        self.replicate.env_override("REPLICATE_API_KEY", None);

        if let Some(base_url) = env_var("LOCAL_LLM_BASE") {
            self.local.base_url = base_url;
        }
        // LOCAL_LLM_MODEL is the legacy single-model setting; the specific
        // variables win when both are present.
        if let Some(model) = env_var("LOCAL_LLM_MODEL") {
            self.local.text_model.clone_from(&model);
            self.local.vision_model = model;
        }
        if let Some(model) = env_var("LOCAL_TEXT_MODEL") {
            self.local.text_model = model;
        }
        if let Some(model) = env_var("LOCAL_VISION_MODEL") {
            self.local.vision_model = model;
        }
        self
    }
}

/// Providers section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileProviders {
    deepseek: Option<ConfigFileApiProvider>,
    openai: Option<ConfigFileApiProvider>,
    anthropic: Option<ConfigFileApiProvider>,
    together: Option<ConfigFileApiProvider>,
    stability: Option<ConfigFileApiProvider>,
    replicate: Option<ConfigFileApiProvider>,
    local: Option<ConfigFileLocal>,
}

/// One hosted-provider section in config file.
#[derive(Debug, Deserialize, Default)]
struct ConfigFileApiProvider {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
}

/// Local server section in config file.
#[derive(Debug, Deserialize, Default)]
struct ConfigFileLocal {
    base_url: Option<String>,
    text_model: Option<String>,
    vision_model: Option<String>,
}
