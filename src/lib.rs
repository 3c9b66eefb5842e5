//! # gugo-engage
//!
//! Meme matching and pluggable AI providers for a social engagement dashboard.
//!
//! Given a tweet, the engine picks the most relevant memes from an uploaded
//! library, drafts reply suggestions, and composes images through whichever
//! text, image, and vision backends the admin settings select.
//!
//! ## Features
//!
//! - Layered meme matching: LLM ranking, keyword heuristics, random fallback
//! - Text backends: local (LM Studio), `DeepSeek`, `OpenAI`, Anthropic
//! - Image backends: Together, `OpenAI`, Stability, Replicate
//! - Vision analysis that fills in meme descriptions and tags
//! - `SQLite` meme library and singleton admin settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use gugo_engage::{AppConfig, MemeMatcher, TweetContext};
//!
//! let matcher = MemeMatcher::from_config(&AppConfig::load_default()?)?;
//! let result = matcher.find_matches(&TweetContext::new("we just won", "gugo"))?;
//! println!("{} via {}", result.memes.len(), result.provenance_label());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod image;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod vision;

pub use config::AppConfig;
pub use llm::LlmProvider;
pub use models::{
    AdminSettings, ImageProviderKind, MatchProvenance, MatchResult, MatchStatus, Meme, MemeId,
    MemeAnalysisModel, TextProviderKind, TweetContext,
};
pub use services::{ImageService, MemeAnalysisService, MemeLibrary, MemeMatcher, ReplyService};
pub use storage::{MemeRepository, SettingsStore, SqliteStore};

/// Error type for gugo-engage operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Configuration` | Unknown provider name, unreadable or invalid config file |
/// | `Provider` | Missing credentials, transport failure, non-2xx, malformed or empty response |
/// | `InvalidInput` | Empty tweet text, empty prompt, unsupported upload type |
/// | `NotFound` | Meme id or backing file does not exist |
/// | `OperationFailed` | `SQLite` or filesystem failures |
///
/// An empty meme library or a `none` ranking answer is not an error; see
/// [`MatchStatus`].
#[derive(Debug, ThisError)]
pub enum Error {
    /// Misconfiguration that retrying cannot fix.
    ///
    /// Raised when:
    /// - A provider name is not one of the known identifiers
    /// - The config file cannot be read or parsed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An upstream AI provider failed.
    ///
    /// Raised when:
    /// - The API key is unset or a placeholder
    /// - The HTTP request fails or times out
    /// - The API answers with a non-success status
    /// - The response body cannot be decoded or carries no output
    #[error("provider '{provider}' failed: {cause}")]
    Provider {
        /// The provider that failed.
        provider: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A requested record or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A storage or filesystem operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Provider`] for the named backend.
    pub fn provider(provider: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            cause: cause.into(),
        }
    }

    /// Builds a [`Error::OperationFailed`].
    pub fn operation(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for gugo-engage operations.
pub type Result<T> = std::result::Result<T, Error>;
