//! Meme match results.

use super::{Meme, TextProviderKind};
use serde::{Serialize, Serializer};
use std::fmt;

/// Maximum number of memes returned for one tweet.
pub const MAX_MATCHES: usize = 3;

/// Which strategy produced a match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchProvenance {
    /// Ranked by the named text provider.
    Provider(TextProviderKind),
    /// Scored by the keyword heuristic.
    Keyword,
    /// Picked at random because nothing scored.
    Random,
}

impl MatchProvenance {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Provider(kind) => kind.as_str(),
            Self::Keyword => "keyword",
            Self::Random => "random",
        }
    }

    /// Returns the human-readable label.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Provider(kind) => kind.display_name(),
            Self::Keyword => "Keyword Matching",
            Self::Random => "Random Selection",
        }
    }

    /// Returns true if an AI provider produced the result.
    #[must_use]
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl fmt::Display for MatchProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MatchProvenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Terminal state of a match request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// A strategy produced a (possibly empty) ranked list.
    Matched,
    /// The meme library is empty.
    NoMemesAvailable,
    /// The ranking model answered `none`.
    NoRelevantMemes,
}

/// Ordered memes for one tweet plus how they were chosen.
///
/// Built fresh for each request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Memes in relevance order, at most [`MAX_MATCHES`].
    pub memes: Vec<Meme>,
    /// Terminal state.
    pub status: MatchStatus,
    /// Producing strategy; `None` only for [`MatchStatus::NoMemesAvailable`].
    pub provenance: Option<MatchProvenance>,
    /// Explanation for display.
    pub message: String,
}

impl MatchResult {
    /// Result for an empty library.
    #[must_use]
    pub fn no_memes_available() -> Self {
        Self {
            memes: Vec::new(),
            status: MatchStatus::NoMemesAvailable,
            provenance: None,
            message: "No memes available".to_string(),
        }
    }

    /// Result for a provider that found nothing relevant.
    #[must_use]
    pub fn no_relevant_memes(provider: TextProviderKind) -> Self {
        Self {
            memes: Vec::new(),
            status: MatchStatus::NoRelevantMemes,
            provenance: Some(MatchProvenance::Provider(provider)),
            message: "No relevant memes found".to_string(),
        }
    }

    /// Result for a ranked list from the given strategy.
    #[must_use]
    pub fn matched(memes: Vec<Meme>, provenance: MatchProvenance) -> Self {
        let message = match provenance {
            MatchProvenance::Provider(_) => format!("Found {} relevant memes", memes.len()),
            MatchProvenance::Keyword => {
                "Using keyword matching (AI provider unavailable)".to_string()
            },
            MatchProvenance::Random => {
                "Showing random memes (no context matches found)".to_string()
            },
        };
        Self {
            memes,
            status: MatchStatus::Matched,
            provenance: Some(provenance),
            message,
        }
    }

    /// Returns the provenance label, or `"none"` when no strategy ran.
    #[must_use]
    pub fn provenance_label(&self) -> &'static str {
        self.provenance.map_or("none", |p| p.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_labels() {
        let p = MatchProvenance::Provider(TextProviderKind::DeepSeek);
        assert_eq!(p.as_str(), "deepseek");
        assert_eq!(p.display_name(), "DeepSeek R1");
        assert!(p.is_provider());
        assert_eq!(MatchProvenance::Keyword.display_name(), "Keyword Matching");
        assert_eq!(MatchProvenance::Random.to_string(), "random");
    }

    #[test]
    fn test_no_memes_available_has_no_provenance() {
        let result = MatchResult::no_memes_available();
        assert!(result.memes.is_empty());
        assert_eq!(result.status, MatchStatus::NoMemesAvailable);
        assert_eq!(result.provenance_label(), "none");
    }

    #[test]
    fn test_serializes_provenance_as_label() {
        let result = MatchResult::matched(Vec::new(), MatchProvenance::Keyword);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["provenance"], "keyword");
        assert_eq!(json["status"], "matched");
    }
}
