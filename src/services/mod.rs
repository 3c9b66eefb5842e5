//! Business logic services.
//!
//! Services read settings fresh on every call and resolve a new provider
//! adapter each time, so concurrent requests share no mutable state beyond
//! the storage connection.

mod analysis;
mod heuristic;
mod images;
mod library;
mod matching;
mod provider_factory;
mod replies;

pub use analysis::{AnalysisRecord, AnalysisStats, MemeAnalysisService};
pub use heuristic::{
    MEME_TRIGGER_WORDS, NEGATIVE_WORDS, POSITIVE_WORDS, TweetSignals, rank_memes, score_meme,
};
pub use images::{GeneratedImage, ImageService};
pub use library::{ALLOWED_EXTENSIONS, MemeEdit, MemeLibrary};
pub use matching::{MemeMatcher, parse_ranking_response, ranking_prompt, ranking_request};
pub use provider_factory::{ProviderFactory, ProviderResolver};
pub use replies::{ReplyService, ReplySuggestions};
