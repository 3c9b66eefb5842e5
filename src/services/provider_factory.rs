//! Provider construction from settings.
//!
//! Adapters hold nothing beyond a credential and an HTTP client, so the
//! services resolve a fresh one per call from the current admin settings.
//!
//! # Architecture
//!
//! ```text
//! ProviderFactory
//!   ├── text_provider(kind)  → Box<dyn LlmProvider>
//!   ├── image_provider(kind) → Box<dyn ImageProvider>
//!   └── analyzer(model)      → Box<dyn MemeAnalyzer>
//! ```

use crate::Result;
use crate::config::{AppConfig, HttpConfig, ProviderSettings};
use crate::image::{
    ImageProvider, OpenAiImageClient, ReplicateClient, StabilityClient, TogetherClient,
};
use crate::llm::{AnthropicClient, DeepSeekClient, LlmProvider, LocalLlmClient, OpenAiClient};
use crate::models::{ImageProviderKind, MemeAnalysisModel, TextProviderKind};
use crate::vision::{FilenameAnalyzer, MemeAnalyzer, VisionChatAnalyzer};

/// Resolves provider identifiers to adapters.
///
/// Services depend on this trait rather than on [`ProviderFactory`] so
/// tests can substitute stub backends.
pub trait ProviderResolver: Send + Sync {
    /// Builds the text backend for `kind`.
    fn text_provider(&self, kind: TextProviderKind) -> Box<dyn LlmProvider>;

    /// Builds the image backend for `kind`.
    fn image_provider(&self, kind: ImageProviderKind) -> Box<dyn ImageProvider>;

    /// Builds the meme analyzer for `model`.
    fn analyzer(&self, model: MemeAnalysisModel) -> Box<dyn MemeAnalyzer>;
}

/// Builds adapters from [`ProviderSettings`].
#[derive(Debug, Clone, Default)]
pub struct ProviderFactory {
    providers: ProviderSettings,
    http: HttpConfig,
}

impl ProviderFactory {
    /// Creates a factory from explicit settings.
    #[must_use]
    pub const fn new(providers: ProviderSettings, http: HttpConfig) -> Self {
        Self { providers, http }
    }

    /// Creates a factory from the application config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.providers.clone(), config.http)
    }

    /// Builds a text backend from a raw name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for unknown names.
    pub fn text_provider_by_name(&self, name: &str) -> Result<Box<dyn LlmProvider>> {
        TextProviderKind::parse(name).map(|kind| self.text_provider(kind))
    }

    /// Builds an image backend from a raw name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for unknown names.
    pub fn image_provider_by_name(&self, name: &str) -> Result<Box<dyn ImageProvider>> {
        ImageProviderKind::parse(name).map(|kind| self.image_provider(kind))
    }

    /// Builds a meme analyzer from a raw name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for unknown names.
    pub fn analyzer_by_name(&self, name: &str) -> Result<Box<dyn MemeAnalyzer>> {
        MemeAnalysisModel::parse(name).map(|model| self.analyzer(model))
    }
}

impl ProviderResolver for ProviderFactory {
    fn text_provider(&self, kind: TextProviderKind) -> Box<dyn LlmProvider> {
        let p = &self.providers;
        match kind {
            TextProviderKind::Local => Box::new(LocalLlmClient::from_config(&p.local, self.http)),
            TextProviderKind::DeepSeek => {
                Box::new(DeepSeekClient::from_config(&p.deepseek, self.http))
            },
            TextProviderKind::OpenAi => Box::new(OpenAiClient::from_config(&p.openai, self.http)),
            TextProviderKind::Anthropic => {
                Box::new(AnthropicClient::from_config(&p.anthropic, self.http))
            },
        }
    }

    fn image_provider(&self, kind: ImageProviderKind) -> Box<dyn ImageProvider> {
        let p = &self.providers;
        match kind {
            ImageProviderKind::Together => {
                Box::new(TogetherClient::from_config(&p.together, self.http))
            },
            ImageProviderKind::OpenAi => {
                Box::new(OpenAiImageClient::from_config(&p.openai, self.http))
            },
            ImageProviderKind::Stability => {
                Box::new(StabilityClient::from_config(&p.stability, self.http))
            },
            ImageProviderKind::Replicate => {
                Box::new(ReplicateClient::from_config(&p.replicate, self.http))
            },
        }
    }

    fn analyzer(&self, model: MemeAnalysisModel) -> Box<dyn MemeAnalyzer> {
        match model {
            MemeAnalysisModel::Local => {
                Box::new(VisionChatAnalyzer::local(&self.providers.local, self.http))
            },
            MemeAnalysisModel::OpenAi => {
                Box::new(VisionChatAnalyzer::openai(&self.providers.openai, self.http))
            },
            MemeAnalysisModel::DeepSeek => Box::new(FilenameAnalyzer::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::config::ApiProviderConfig;

    #[test]
    fn test_text_provider_names() {
        let factory = ProviderFactory::default();
        for kind in TextProviderKind::ALL {
            assert_eq!(factory.text_provider(kind).name(), kind.as_str());
        }
    }

    #[test]
    fn test_image_provider_names() {
        let factory = ProviderFactory::default();
        for kind in ImageProviderKind::ALL {
            assert_eq!(factory.image_provider(kind).name(), kind.as_str());
        }
    }

    #[test]
    fn test_analyzer_names() {
        let factory = ProviderFactory::default();
        assert_eq!(factory.analyzer(MemeAnalysisModel::DeepSeek).name(), "deepseek");
        assert_eq!(factory.analyzer_by_name("LOCAL").unwrap().name(), "local");
    }

    #[test]
    fn test_unknown_names_are_configuration_errors() {
        let factory = ProviderFactory::default();
        assert!(matches!(
            factory.text_provider_by_name("grok"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            factory.image_provider_by_name("midjourney"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            factory.analyzer_by_name("gemini"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_credentials_flow_through() {
        let mut providers = ProviderSettings::default();
        providers.deepseek = ApiProviderConfig::default().with_api_key("sk-live");
        providers.together = ApiProviderConfig::default().with_api_key("your-together-api-key-here");
        let factory = ProviderFactory::new(providers, HttpConfig::default());

        assert!(factory.text_provider(TextProviderKind::DeepSeek).is_configured());
        assert!(!factory.text_provider(TextProviderKind::OpenAi).is_configured());
        assert!(!factory.image_provider(ImageProviderKind::Together).is_configured());
        assert!(factory.text_provider(TextProviderKind::Local).is_configured());
    }
}
