//! Keyword heuristic meme scoring.
//!
//! Used when no AI ranking is available. Scores are additive; all string
//! checks are lowercase substring tests.

use crate::models::{MAX_MATCHES, Meme};

/// Words that tend to pick a meme on their own.
pub const MEME_TRIGGER_WORDS: &[&str] = &[
    "win",
    "lose",
    "fail",
    "success",
    "money",
    "rich",
    "poor",
    "run",
    "gugo",
    "moon",
    "dump",
    "pump",
    "chad",
    "based",
    "confused",
    "excited",
    "happy",
    "sad",
    "angry",
    "thinking",
    "celebrating",
];

/// Positive sentiment lexicon.
pub const POSITIVE_WORDS: &[&str] = &[
    "great",
    "awesome",
    "amazing",
    "good",
    "nice",
    "love",
    "win",
    "success",
    "happy",
    "excited",
    "celebrating",
    "thumbs up",
];

/// Negative sentiment lexicon.
pub const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "fail",
    "lose",
    "dump",
    "sad",
    "crying",
    "confused",
    "frustrated",
];

const KEYWORD_IN_DESCRIPTION: u32 = 10;
const KEYWORD_IN_TAGS: u32 = 2;
const KEYWORD_IN_FILENAME: u32 = 1;
const TRIGGER_IN_DESCRIPTION: u32 = 8;
const TRIGGER_IN_TAGS: u32 = 2;
const BRAND_AFFINITY: u32 = 2;
const SENTIMENT_IN_DESCRIPTION: u32 = 5;
const SENTIMENT_IN_TAGS: u32 = 1;
const DESCRIPTIVE_BONUS: u32 = 1;
const DESCRIPTIVE_MIN_CHARS: usize = 20;

/// Tweet features reused across every meme.
#[derive(Debug, Clone)]
pub struct TweetSignals {
    text: String,
    keywords: Vec<String>,
    triggers: Vec<&'static str>,
    positive: bool,
    negative: bool,
}

impl TweetSignals {
    /// Extracts signals from tweet text.
    #[must_use]
    pub fn new(tweet_text: &str) -> Self {
        let text = tweet_text.to_lowercase();
        let keywords = text
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .map(str::to_string)
            .collect();
        let triggers = MEME_TRIGGER_WORDS
            .iter()
            .copied()
            .filter(|word| text.contains(word))
            .collect();
        let positive = POSITIVE_WORDS.iter().any(|word| text.contains(word));
        let negative = NEGATIVE_WORDS.iter().any(|word| text.contains(word));

        Self {
            text,
            keywords,
            triggers,
            positive,
            negative,
        }
    }

    /// Lowercased keywords longer than three characters.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// The lowercased tweet text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Scores one meme against the tweet.
#[must_use]
pub fn score_meme(signals: &TweetSignals, meme: &Meme) -> u32 {
    let description = meme.description_text().to_lowercase();
    let tags: Vec<String> = meme.tags.iter().map(|tag| tag.to_lowercase()).collect();
    let tags_text = tags.join(" ");
    let filename = meme.filename.to_lowercase();

    let mut score = 0;

    for keyword in &signals.keywords {
        if description.contains(keyword.as_str()) {
            score += KEYWORD_IN_DESCRIPTION;
        }
        if tags_text.contains(keyword.as_str()) {
            score += KEYWORD_IN_TAGS;
        }
        if filename.contains(keyword.as_str()) {
            score += KEYWORD_IN_FILENAME;
        }
    }

    for word in &signals.triggers {
        if description.contains(word) {
            score += TRIGGER_IN_DESCRIPTION;
        }
        if tags_text.contains(word) {
            score += TRIGGER_IN_TAGS;
        }
    }

    // tags compare lowercased, so "GUGO" and "Official" count
    if description.contains("gugo") || tags.iter().any(|tag| tag == "gugo" || tag == "official")
    {
        score += BRAND_AFFINITY;
    }

    for (matched, lexicon) in [
        (signals.positive, POSITIVE_WORDS),
        (signals.negative, NEGATIVE_WORDS),
    ] {
        if !matched {
            continue;
        }
        for word in lexicon {
            if description.contains(word) {
                score += SENTIMENT_IN_DESCRIPTION;
            }
            if tags_text.contains(word) {
                score += SENTIMENT_IN_TAGS;
            }
        }
    }

    if meme.description_text().chars().count() > DESCRIPTIVE_MIN_CHARS {
        score += DESCRIPTIVE_BONUS;
    }

    score
}

/// Returns the top-scoring memes, best first, dropping zero scores.
///
/// Ties keep library order.
#[must_use]
pub fn rank_memes(tweet_text: &str, memes: &[Meme]) -> Vec<Meme> {
    let signals = TweetSignals::new(tweet_text);
    let mut scored: Vec<(u32, &Meme)> = memes
        .iter()
        .map(|meme| (score_meme(&signals, meme), meme))
        .filter(|(score, _)| *score > 0)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(MAX_MATCHES)
        .map(|(_, meme)| meme.clone())
        .collect()
}
