//! Property-based tests for meme matching and reply parsing.
//!
//! Uses proptest to verify invariants across random libraries and tweets:
//! - Results hold at most three distinct memes drawn from the library
//! - Provider failures never surface as provider provenance
//! - Random selection only happens when nothing scores
//! - Keyword ranking is deterministic
//! - Reply parsing never yields an empty list

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gugo_engage::image::ImageProvider;
use gugo_engage::llm::{
    CompletionRequest, LlmProvider, MAX_SUGGESTIONS, parse_reply_suggestions,
};
use gugo_engage::services::{
    ProviderResolver, TweetSignals, parse_ranking_response, rank_memes, score_meme,
};
use gugo_engage::vision::{FilenameAnalyzer, MemeAnalyzer};
use gugo_engage::{
    Error, ImageProviderKind, MatchProvenance, MatchStatus, Meme, MemeAnalysisModel,
    MemeMatcher, MemeRepository, SqliteStore, TextProviderKind, TweetContext,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

const WORDS: &[&str] = &[
    "win", "duck", "moon", "sad", "happy", "gugo", "money", "celebrating", "frog", "pump",
    "confused", "terrible", "great", "rocket", "chart", "official", "today", "crying",
];

struct FixedLlm(Option<String>);

impl LlmProvider for FixedLlm {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn complete(&self, _request: &CompletionRequest) -> gugo_engage::Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::provider("fixed", "connection refused"))
    }
}

struct FixedResolver(Option<String>);

impl ProviderResolver for FixedResolver {
    fn text_provider(&self, _kind: TextProviderKind) -> Box<dyn LlmProvider> {
        Box::new(FixedLlm(self.0.clone()))
    }

    fn image_provider(&self, _kind: ImageProviderKind) -> Box<dyn ImageProvider> {
        unreachable!("matching never builds image providers")
    }

    fn analyzer(&self, _model: MemeAnalysisModel) -> Box<dyn MemeAnalyzer> {
        Box::new(FilenameAnalyzer::new())
    }
}

fn phrase(max_words: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..=max_words)
        .prop_map(|words| words.join(" "))
}

fn meme_specs() -> impl Strategy<Value = Vec<(String, Vec<&'static str>)>> {
    prop::collection::vec(
        (phrase(6), prop::collection::vec(prop::sample::select(WORDS), 0..3)),
        0..8,
    )
}

fn build_library(specs: &[(String, Vec<&'static str>)]) -> Vec<Meme> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (description, tags))| {
            Meme::new(format!("m{i}.png"), format!("/memes/m{i}.png"))
                .with_id(format!("m{i}"))
                .with_description(description.clone())
                .with_tags(tags.iter().copied())
        })
        .collect()
}

fn matcher(memes: &[Meme], answer: Option<String>) -> MemeMatcher {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    for meme in memes {
        store.insert(meme).unwrap();
    }
    MemeMatcher::new(store.clone(), store, Arc::new(FixedResolver(answer))).with_seed(42)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: results are a small, duplicate-free subset of the library.
    #[test]
    fn prop_results_are_bounded_subset(
        specs in meme_specs(),
        tweet in phrase(8).prop_filter("non-blank", |t| !t.trim().is_empty()),
        answer in prop::option::of("[m0-9, ]{0,20}"),
    ) {
        let memes = build_library(&specs);
        let result = matcher(&memes, answer)
            .find_matches(&TweetContext::new(tweet, "gugo"))
            .unwrap();

        prop_assert!(result.memes.len() <= 3);
        let library_ids: HashSet<&str> = memes.iter().map(|m| m.id.as_str()).collect();
        let mut seen = HashSet::new();
        for meme in &result.memes {
            prop_assert!(library_ids.contains(meme.id.as_str()));
            prop_assert!(seen.insert(meme.id.as_str()));
        }
        if memes.is_empty() {
            prop_assert_eq!(result.status, MatchStatus::NoMemesAvailable);
            prop_assert!(result.memes.is_empty());
        }
    }

    /// Property: a failed provider yields keyword or random provenance, and
    /// random only when no meme scores above zero.
    #[test]
    fn prop_failed_provider_falls_back(
        specs in meme_specs().prop_filter("non-empty", |s| !s.is_empty()),
        tweet in phrase(8).prop_filter("non-blank", |t| !t.trim().is_empty()),
    ) {
        let memes = build_library(&specs);
        let result = matcher(&memes, None)
            .find_matches(&TweetContext::new(tweet.clone(), "gugo"))
            .unwrap();

        let signals = TweetSignals::new(&tweet);
        let any_scored = memes.iter().any(|m| score_meme(&signals, m) > 0);
        match result.provenance {
            Some(MatchProvenance::Keyword) => {
                prop_assert!(any_scored);
                prop_assert!(!result.memes.is_empty());
            },
            Some(MatchProvenance::Random) => {
                prop_assert!(!any_scored);
                prop_assert_eq!(result.memes.len(), memes.len().min(3));
            },
            other => prop_assert!(false, "unexpected provenance {:?}", other),
        }
    }

    /// Property: keyword ranking is deterministic and score-ordered.
    #[test]
    fn prop_keyword_ranking_is_deterministic(specs in meme_specs(), tweet in phrase(8)) {
        let memes = build_library(&specs);
        let first = rank_memes(&tweet, &memes);
        let second = rank_memes(&tweet, &memes);
        prop_assert_eq!(&first, &second);

        let signals = TweetSignals::new(&tweet);
        let scores: Vec<u32> = first.iter().map(|m| score_meme(&signals, m)).collect();
        prop_assert!(scores.iter().all(|s| *s > 0));
        prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    /// Property: parsed ranking answers never exceed three known, unique ids.
    #[test]
    fn prop_ranking_parse_is_bounded(specs in meme_specs(), answer in "[a-z0-9, ]{0,40}") {
        let memes = build_library(&specs);
        if let Some(ranked) = parse_ranking_response(&answer, &memes) {
            prop_assert!(ranked.len() <= 3);
            let unique: HashSet<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
            prop_assert_eq!(unique.len(), ranked.len());
        }
    }

    /// Property: reply parsing always yields one to three suggestions.
    #[test]
    fn prop_reply_parse_never_empty(content in "(?s).{0,300}") {
        let suggestions = parse_reply_suggestions(&content);
        prop_assert!(!suggestions.is_empty());
        prop_assert!(suggestions.len() <= MAX_SUGGESTIONS);
        prop_assert!(suggestions.iter().all(|s| !s.trim().is_empty()));
    }
}
