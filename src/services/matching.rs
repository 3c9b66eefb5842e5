//! Meme matching engine.
//!
//! Ranks the meme library against a tweet by trying an ordered chain of
//! strategies and stopping at the first one that yields a result:
//!
//! ```text
//! Provider ──(failed or unconfigured)──> Keyword ──(nothing scored)──> Random
//! ```
//!
//! Provider failures never escape [`MemeMatcher::find_matches`]; they are
//! logged, counted, and absorbed by the next strategy. A clean `none`
//! answer is terminal and does not fall through.

use crate::config::AppConfig;
use crate::llm::CompletionRequest;
use crate::models::{
    MAX_MATCHES, MatchProvenance, MatchResult, Meme, TextProviderKind, TweetContext,
};
use crate::services::heuristic::rank_memes;
use crate::services::provider_factory::{ProviderFactory, ProviderResolver};
use crate::storage::{MemeRepository, SettingsStore, SqliteStore};
use crate::{Error, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

const RANKING_TEMPERATURE: f32 = 0.3;
const RANKING_MAX_TOKENS: u32 = 100;

const RANKING_INSTRUCTIONS: &str = "\
Analyze the tweet content and recommend the top 3 most relevant memes from the list above. Focus heavily on:
1. Description relevance to tweet content/emotion
2. Situational match (what's happening in the meme vs tweet context)
3. Emotional tone alignment
4. Humor potential and timing

Prioritize memes with detailed descriptions that match the tweet's situation or emotion.

Respond with only the meme IDs in order of relevance, separated by commas. If no memes are relevant, respond with \"none\".
Example: id1,id2,id3";

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Provider(TextProviderKind),
    Keyword,
    Random,
}

/// Matches memes to tweets.
pub struct MemeMatcher {
    memes: Arc<dyn MemeRepository>,
    settings: Arc<dyn SettingsStore>,
    providers: Arc<dyn ProviderResolver>,
    seed: Option<u64>,
}

impl MemeMatcher {
    /// Creates a matcher over the given collaborators.
    #[must_use]
    pub fn new(
        memes: Arc<dyn MemeRepository>,
        settings: Arc<dyn SettingsStore>,
        providers: Arc<dyn ProviderResolver>,
    ) -> Self {
        Self {
            memes,
            settings,
            providers,
            seed: None,
        }
    }

    /// Creates a matcher backed by the configured `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(config.database_path())?);
        Ok(Self::new(
            store.clone(),
            store,
            Arc::new(ProviderFactory::from_config(config)),
        ))
    }

    /// Seeds the random fallback so its picks are reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Finds up to three memes for a tweet.
    ///
    /// An empty library yields [`crate::MatchStatus::NoMemesAvailable`]
    /// without consulting settings or providers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for blank tweet text, or a storage or
    /// configuration error from the repository or settings store. Provider
    /// failures are never returned.
    #[instrument(skip(self, tweet), fields(operation = "meme_match", author = %tweet.author))]
    pub fn find_matches(&self, tweet: &TweetContext) -> Result<MatchResult> {
        if tweet.text.trim().is_empty() {
            return Err(Error::InvalidInput("tweet text is required".to_string()));
        }

        let start = Instant::now();
        let memes = self.memes.list_all()?;

        let result = if memes.is_empty() {
            tracing::info!("Meme library is empty");
            MatchResult::no_memes_available()
        } else {
            let settings = self.settings.get_or_create_default()?;
            let chain = [
                Strategy::Provider(settings.meme_match_model),
                Strategy::Keyword,
                Strategy::Random,
            ];
            chain
                .into_iter()
                .find_map(|strategy| self.attempt(strategy, tweet, &memes))
                .unwrap_or_else(|| MatchResult::matched(Vec::new(), MatchProvenance::Random))
        };

        tracing::info!(
            provenance = result.provenance_label(),
            matches = result.memes.len(),
            library_size = memes.len(),
            "Meme match complete"
        );
        metrics::counter!("meme_match_total", "provenance" => result.provenance_label())
            .increment(1);
        metrics::histogram!("meme_match_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(result)
    }

    fn attempt(
        &self,
        strategy: Strategy,
        tweet: &TweetContext,
        memes: &[Meme],
    ) -> Option<MatchResult> {
        match strategy {
            Strategy::Provider(kind) => self.rank_with_provider(kind, tweet, memes),
            Strategy::Keyword => {
                let ranked = rank_memes(&tweet.text, memes);
                if ranked.is_empty() {
                    tracing::debug!("No keyword matches, falling back to random selection");
                    None
                } else {
                    Some(MatchResult::matched(ranked, MatchProvenance::Keyword))
                }
            },
            Strategy::Random => Some(MatchResult::matched(
                self.random_pick(memes),
                MatchProvenance::Random,
            )),
        }
    }

    fn rank_with_provider(
        &self,
        kind: TextProviderKind,
        tweet: &TweetContext,
        memes: &[Meme],
    ) -> Option<MatchResult> {
        let provider = self.providers.text_provider(kind);
        if !provider.is_configured() {
            tracing::info!(
                provider = kind.as_str(),
                error_kind = "unconfigured",
                "Meme match provider not configured, using keyword matching"
            );
            record_provider_failure(kind);
            return None;
        }

        let request = ranking_request(tweet, memes);
        match provider.complete(&request) {
            Ok(response) => Some(match parse_ranking_response(&response, memes) {
                Some(ranked) => MatchResult::matched(ranked, MatchProvenance::Provider(kind)),
                None => MatchResult::no_relevant_memes(kind),
            }),
            Err(e) => {
                tracing::warn!(
                    provider = kind.as_str(),
                    error = %e,
                    "Meme match provider failed, using keyword matching"
                );
                record_provider_failure(kind);
                None
            },
        }
    }

    fn random_pick(&self, memes: &[Meme]) -> Vec<Meme> {
        let mut pool = memes.to_vec();
        match self.seed {
            Some(seed) => pool.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => pool.shuffle(&mut rand::rng()),
        }
        pool.truncate(MAX_MATCHES);
        pool
    }
}

fn record_provider_failure(kind: TextProviderKind) {
    metrics::counter!("meme_match_provider_failures_total", "provider" => kind.as_str())
        .increment(1);
}

/// Builds the ranking prompt listing every meme as `ID: <id> - <description> (Tags: ...)`.
#[must_use]
pub fn ranking_prompt(tweet: &TweetContext, memes: &[Meme]) -> String {
    let mut prompt = format!(
        "Tweet: \"{}\"\nAuthor: {}\n\nAvailable memes (focus on descriptions for relevance):\n",
        tweet.text, tweet.author
    );
    for meme in memes {
        let description = meme
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("No description");
        let _ = write!(prompt, "ID: {} - {description}", meme.id);
        if !meme.tags.is_empty() {
            let _ = write!(prompt, " (Tags: {})", meme.tags.join(", "));
        }
        prompt.push('\n');
    }
    prompt.push('\n');
    prompt.push_str(RANKING_INSTRUCTIONS);
    prompt
}

/// Builds the single-message ranking completion request.
#[must_use]
pub fn ranking_request(tweet: &TweetContext, memes: &[Meme]) -> CompletionRequest {
    CompletionRequest::new(ranking_prompt(tweet, memes))
        .with_temperature(RANKING_TEMPERATURE)
        .with_max_tokens(RANKING_MAX_TOKENS)
}

/// Maps a ranking answer back onto the library.
///
/// Returns `None` when the model answered `none` (or nothing at all).
/// Otherwise returns the known memes in the model's order, without
/// duplicates and capped at [`MAX_MATCHES`]; unknown ids are dropped, so
/// the list may be empty.
#[must_use]
pub fn parse_ranking_response(response: &str, memes: &[Meme]) -> Option<Vec<Meme>> {
    let answer = response.trim();
    let bare = answer
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches('.')
        .trim();
    if bare.is_empty() || bare.eq_ignore_ascii_case("none") {
        return None;
    }

    let mut ranked: Vec<Meme> = Vec::new();
    for id in answer.split(',').map(str::trim) {
        if ranked.len() == MAX_MATCHES {
            break;
        }
        if ranked.iter().any(|m| m.id.as_str() == id) {
            continue;
        }
        if let Some(meme) = memes.iter().find(|m| m.id.as_str() == id) {
            ranked.push(meme.clone());
        }
    }
    Some(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn library() -> Vec<Meme> {
        vec![
            Meme::new("a.png", "/m/a.png")
                .with_id("a")
                .with_description("duck celebrating a win")
                .with_tags(["gugo", "win"]),
            Meme::new("b.png", "/m/b.png")
                .with_id("b")
                .with_description("sad confused duck")
                .with_tags(["sad"]),
            Meme::new("c.png", "/m/c.png").with_id("c"),
        ]
    }

    fn ids(memes: &[Meme]) -> Vec<&str> {
        memes.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_ranking_prompt_lines() {
        let tweet = TweetContext::new("just had a huge win today!", "@gugo");
        let prompt = ranking_prompt(&tweet, &library());

        assert!(prompt.starts_with("Tweet: \"just had a huge win today!\"\nAuthor: gugo\n"));
        assert!(prompt.contains("ID: a - duck celebrating a win (Tags: gugo, win)\n"));
        assert!(prompt.contains("ID: b - sad confused duck (Tags: sad)\n"));
        assert!(prompt.contains("ID: c - No description\n"));
        assert!(prompt.ends_with("Example: id1,id2,id3"));
        assert!(!prompt.contains('|'));
    }

    #[test]
    fn test_ranking_request_settings() {
        let tweet = TweetContext::new("hi", "me");
        let request = ranking_request(&tweet, &library());
        assert!(request.system.is_none());
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, 100);
    }

    #[test_case("none" ; "bare")]
    #[test_case("None." ; "capitalized with period")]
    #[test_case("\"none\"" ; "quoted")]
    #[test_case("   " ; "blank")]
    fn test_parse_none(answer: &str) {
        assert!(parse_ranking_response(answer, &library()).is_none());
    }

    #[test_case("b,a", &["b", "a"] ; "model order kept")]
    #[test_case(" c , zz, a ", &["c", "a"] ; "unknown ids dropped")]
    #[test_case("a,a,b", &["a", "b"] ; "duplicates removed")]
    #[test_case("a,b,c,a", &["a", "b", "c"] ; "capped at three")]
    #[test_case("zz,yy", &[] ; "no known ids")]
    fn test_parse_ids(answer: &str, expected: &[&str]) {
        let lib = library();
        let ranked = parse_ranking_response(answer, &lib).unwrap();
        assert_eq!(ids(&ranked), expected);
    }
}
