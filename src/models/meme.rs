//! Meme records and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a meme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemeId(String);

impl MemeId {
    /// Creates a new meme ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A stored meme image with the metadata used for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    /// Unique identifier.
    pub id: MemeId,
    /// File name on disk, unique within the library.
    pub filename: String,
    /// Storage path of the backing file.
    pub path: String,
    /// Free-text description; the primary signal for matching.
    pub description: Option<String>,
    /// Unordered tags, possibly empty.
    pub tags: Vec<String>,
    /// Whether a vision analysis pass filled in description and tags.
    pub analyzed: bool,
    /// Upload time.
    pub created_at: DateTime<Utc>,
}

impl Meme {
    /// Creates an unanalyzed meme with a generated ID.
    #[must_use]
    pub fn new(filename: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: MemeId::generate(),
            filename: filename.into(),
            path: path.into(),
            description: None,
            tags: Vec::new(),
            analyzed: false,
            created_at: Utc::now(),
        }
    }

    /// Sets the ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<MemeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the description, or an empty string when unset.
    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// The tweet a match or reply is computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetContext {
    /// Tweet body.
    pub text: String,
    /// Author handle without the leading `@`.
    pub author: String,
}

impl TweetContext {
    /// Creates a tweet context.
    #[must_use]
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into().trim_start_matches('@').to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meme_builder() {
        let meme = Meme::new("duck.png", "storage/memes/duck.png")
            .with_id("a")
            .with_description("duck celebrating a win")
            .with_tags(["gugo", "win"]);

        assert_eq!(meme.id.as_str(), "a");
        assert_eq!(meme.description_text(), "duck celebrating a win");
        assert_eq!(meme.tags, vec!["gugo".to_string(), "win".to_string()]);
        assert!(!meme.analyzed);
    }

    #[test]
    fn test_description_text_defaults_to_empty() {
        let meme = Meme::new("x.png", "x.png");
        assert_eq!(meme.description_text(), "");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(MemeId::generate(), MemeId::generate());
    }

    #[test]
    fn test_tweet_context_strips_at() {
        let tweet = TweetContext::new("gm", "@gugo");
        assert_eq!(tweet.author, "gugo");
    }
}
