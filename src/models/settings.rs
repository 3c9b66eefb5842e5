//! Admin settings and provider identifiers.
//!
//! Every provider identifier is a closed enum. Parsing an unknown name is a
//! configuration error, so a bad value is rejected where it enters the
//! system instead of at the first outbound call.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed ID of the singleton settings record.
pub const SETTINGS_ID: &str = "admin";

/// Text generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextProviderKind {
    /// OpenAI-compatible local server (LM Studio).
    #[default]
    Local,
    /// `DeepSeek` chat completions.
    DeepSeek,
    /// `OpenAI` chat completions.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
}

impl TextProviderKind {
    /// All variants, in display order.
    pub const ALL: [Self; 4] = [Self::Local, Self::DeepSeek, Self::OpenAi, Self::Anthropic];

    /// Parses a provider name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "deepseek" => Ok(Self::DeepSeek),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(Error::Configuration(format!(
                "unknown text provider: '{other}'"
            ))),
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::DeepSeek => "deepseek",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Returns the human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Local => "Local LLM",
            Self::DeepSeek => "DeepSeek R1",
            Self::OpenAi => "OpenAI GPT",
            Self::Anthropic => "Anthropic Claude",
        }
    }
}

/// Image generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// Together AI image generations.
    #[default]
    Together,
    /// `OpenAI` image generations.
    OpenAi,
    /// Stability AI text-to-image.
    Stability,
    /// Replicate predictions (returns URLs).
    Replicate,
}

impl ImageProviderKind {
    /// All variants, in display order.
    pub const ALL: [Self; 4] = [Self::Together, Self::OpenAi, Self::Stability, Self::Replicate];

    /// Parses a provider name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "together" => Ok(Self::Together),
            "openai" => Ok(Self::OpenAi),
            "stability" => Ok(Self::Stability),
            "replicate" => Ok(Self::Replicate),
            other => Err(Error::Configuration(format!(
                "unknown image provider: '{other}'"
            ))),
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Together => "together",
            Self::OpenAi => "openai",
            Self::Stability => "stability",
            Self::Replicate => "replicate",
        }
    }
}

/// Vision backends used to describe and tag memes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemeAnalysisModel {
    /// Local vision model behind an OpenAI-compatible server.
    #[default]
    Local,
    /// `OpenAI` vision chat.
    OpenAi,
    /// `DeepSeek` (no vision endpoint; filename heuristics).
    DeepSeek,
}

impl MemeAnalysisModel {
    /// All variants, in display order.
    pub const ALL: [Self; 3] = [Self::Local, Self::OpenAi, Self::DeepSeek];

    /// Parses an analysis model name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(Error::Configuration(format!(
                "unknown meme analysis model: '{other}'"
            ))),
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
        }
    }
}

macro_rules! impl_display_from_str {
    ($($ty:ty),+) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }
    )+};
}

impl_display_from_str!(TextProviderKind, ImageProviderKind, MemeAnalysisModel);

/// Singleton admin configuration selecting a provider per capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    /// Backend for reply suggestions.
    pub text_provider: TextProviderKind,
    /// Backend for composite images.
    pub image_provider: ImageProviderKind,
    /// Backend that ranks memes against a tweet.
    pub meme_match_model: TextProviderKind,
    /// Backend that describes and tags memes.
    pub meme_analysis_model: MemeAnalysisModel,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            text_provider: TextProviderKind::Local,
            image_provider: ImageProviderKind::Together,
            meme_match_model: TextProviderKind::Local,
            meme_analysis_model: MemeAnalysisModel::Local,
            updated_at: Utc::now(),
        }
    }
}

/// Partial update to [`AdminSettings`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// New text provider.
    pub text_provider: Option<TextProviderKind>,
    /// New image provider.
    pub image_provider: Option<ImageProviderKind>,
    /// New meme ranking backend.
    pub meme_match_model: Option<TextProviderKind>,
    /// New meme analysis backend.
    pub meme_analysis_model: Option<MemeAnalysisModel>,
}

impl SettingsUpdate {
    /// Returns true if the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text_provider.is_none()
            && self.image_provider.is_none()
            && self.meme_match_model.is_none()
            && self.meme_analysis_model.is_none()
    }

    /// Applies the update, bumping `updated_at`.
    pub fn apply_to(&self, settings: &mut AdminSettings) {
        if let Some(v) = self.text_provider {
            settings.text_provider = v;
        }
        if let Some(v) = self.image_provider {
            settings.image_provider = v;
        }
        if let Some(v) = self.meme_match_model {
            settings.meme_match_model = v;
        }
        if let Some(v) = self.meme_analysis_model {
            settings.meme_analysis_model = v;
        }
        settings.updated_at = Utc::now();
    }
}
