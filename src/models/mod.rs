//! Data models for gugo-engage.

mod matching;
mod meme;
mod settings;

pub use matching::{MAX_MATCHES, MatchProvenance, MatchResult, MatchStatus};
pub use meme::{Meme, MemeId, TweetContext};
pub use settings::{
    AdminSettings, ImageProviderKind, MemeAnalysisModel, SETTINGS_ID, SettingsUpdate,
    TextProviderKind,
};
