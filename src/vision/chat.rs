//! Vision analysis through an OpenAI-compatible chat endpoint.

use super::{MemeAnalysis, MemeAnalyzer, parse_analysis};
use crate::config::{ApiProviderConfig, HttpConfig, LocalLlmConfig};
use crate::image::path_to_data_url;
use crate::llm::{ChatCompletionsClient, ChatMessage, ContentPart, OpenAiClient};
use crate::{Error, Result};
use std::path::Path;

const ANALYSIS_PROMPT: &str = "\
Analyze this meme image. Describe what it shows, including any characters, \
expressions, text, and the emotion or situation it conveys, so it can be \
matched to tweets later. Respond only with JSON in this form:
{\"description\": \"one or two sentences\", \"tags\": [\"3-8 short lowercase tags\"]}";

const ANALYSIS_TEMPERATURE: f32 = 0.2;
const ANALYSIS_MAX_TOKENS: u32 = 400;

/// Meme analyzer backed by a vision-capable chat model.
pub struct VisionChatAnalyzer {
    name: &'static str,
    display_name: &'static str,
    require_key: bool,
    inner: ChatCompletionsClient,
}

impl VisionChatAnalyzer {
    /// Default `OpenAI` vision model.
    pub const DEFAULT_OPENAI_MODEL: &'static str = "gpt-4o-mini";

    /// Analyzer for the local server's vision model.
    #[must_use]
    pub fn local(config: &LocalLlmConfig, http: HttpConfig) -> Self {
        let mut inner = ChatCompletionsClient::new(
            "local",
            "LOCAL_LLM_BASE",
            crate::llm::local_api_root(&config.base_url),
            config.vision_model.clone(),
        );
        inner.set_http_config(http);
        Self {
            name: "local",
            display_name: "local vision model",
            require_key: false,
            inner,
        }
    }

    /// Analyzer for `OpenAI` vision chat.
    #[must_use]
    pub fn openai(config: &ApiProviderConfig, http: HttpConfig) -> Self {
        let mut inner = ChatCompletionsClient::new(
            "openai",
            "OPENAI_API_KEY",
            config
                .base_url
                .as_deref()
                .map_or(OpenAiClient::DEFAULT_ENDPOINT, |url| url.trim_end_matches('/')),
            Self::DEFAULT_OPENAI_MODEL,
        );
        inner.set_http_config(http);
        if let Some(key) = config.api_key() {
            inner.set_api_key(key);
        }
        Self {
            name: "openai",
            display_name: "OpenAI vision",
            require_key: true,
            inner,
        }
    }

    /// Returns the vision model in use.
    #[must_use]
    pub fn model(&self) -> &str {
        self.inner.model()
    }
}

impl MemeAnalyzer for VisionChatAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn analyze_meme(&self, image_path: &Path, filename: &str) -> Result<MemeAnalysis> {
        let data_url = path_to_data_url(image_path)?;
        let messages = vec![ChatMessage::parts(
            "user",
            vec![
                ContentPart::Text {
                    text: format!("{ANALYSIS_PROMPT}\n\nFilename: {filename}"),
                },
                ContentPart::image_url(data_url),
            ],
        )];

        tracing::debug!(analyzer = self.name, model = %self.inner.model(), filename, "Analyzing meme");
        let content = self.inner.chat(
            messages,
            ANALYSIS_TEMPERATURE,
            ANALYSIS_MAX_TOKENS,
            self.require_key,
        )?;

        let (description, tags) = parse_analysis(&content);
        if description.is_empty() {
            return Err(Error::provider(self.name, "empty analysis response"));
        }

        Ok(MemeAnalysis {
            description,
            tags,
            is_actual_ai: true,
            status_message: format!("Analyzed with {} ({})", self.display_name, self.inner.model()),
        })
    }
}
