//! Vision analysis that describes and tags memes.

mod chat;
mod filename;

pub use chat::VisionChatAnalyzer;
pub use filename::FilenameAnalyzer;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum tags kept from one analysis.
pub const MAX_TAGS: usize = 10;

/// Output of one meme analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeAnalysis {
    /// Description of what the meme shows.
    pub description: String,
    /// Lowercase, deduplicated tags.
    pub tags: Vec<String>,
    /// False when the result was derived without a vision model.
    #[serde(rename = "isActualAI")]
    pub is_actual_ai: bool,
    /// Human-readable note about how the analysis was produced.
    pub status_message: String,
}

/// Trait for meme analysis backends.
pub trait MemeAnalyzer: Send + Sync {
    /// The backend name.
    fn name(&self) -> &'static str;

    /// Analyzes the image at `image_path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Provider`] if the backend call fails, or
    /// [`crate::Error::OperationFailed`] if the image cannot be read.
    fn analyze_meme(&self, image_path: &Path, filename: &str) -> Result<MemeAnalysis>;
}

impl<A: MemeAnalyzer + ?Sized> MemeAnalyzer for Box<A> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn analyze_meme(&self, image_path: &Path, filename: &str) -> Result<MemeAnalysis> {
        (**self).analyze_meme(image_path, filename)
    }
}

/// Lowercases, trims, and deduplicates tags, keeping first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().trim_start_matches('#').to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

/// Extracts JSON from a response that may contain extra text.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end >= start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Tags as either a JSON array or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Option<RawTags>,
}

/// Parses model output into a description and tags.
///
/// Accepts a JSON object embedded in prose. Output without usable JSON is
/// kept whole as the description, with no tags.
pub(crate) fn parse_analysis(content: &str) -> (String, Vec<String>) {
    let parsed = extract_json(content).and_then(|json| serde_json::from_str::<RawAnalysis>(json).ok());

    match parsed {
        Some(raw) => {
            let tags = match raw.tags {
                Some(RawTags::List(list)) => normalize_tags(list),
                Some(RawTags::Joined(joined)) => normalize_tags(joined.split(',')),
                None => Vec::new(),
            };
            (raw.description.trim().to_string(), tags)
        },
        None => (content.trim().to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_normalize_tags() {
        assert_eq!(
            normalize_tags(["Duck", " duck ", "#GUGO", "", "win"]),
            vec!["duck", "gugo", "win"]
        );
    }

    #[test]
    fn test_normalize_tags_caps_count() {
        let many: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        assert_eq!(normalize_tags(&many).len(), MAX_TAGS);
    }

    #[test_case(
        r#"{"description": "A duck celebrating", "tags": ["Duck", "win"]}"#,
        "A duck celebrating", &["duck", "win"] ; "plain json"
    )]
    #[test_case(
        "Sure! ```json\n{\"description\": \"Sad duck\", \"tags\": \"sad, crying\"}\n```",
        "Sad duck", &["sad", "crying"] ; "fenced json with joined tags"
    )]
    #[test_case("A duck on the moon.", "A duck on the moon.", &[] ; "prose only")]
    fn test_parse_analysis(content: &str, description: &str, tags: &[&str]) {
        let (d, t) = parse_analysis(content);
        assert_eq!(d, description);
        assert_eq!(t, tags);
    }

    #[test]
    fn test_serializes_is_actual_ai_key() {
        let analysis = MemeAnalysis {
            description: "d".to_string(),
            tags: vec![],
            is_actual_ai: false,
            status_message: "s".to_string(),
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["isActualAI"], false);
        assert_eq!(json["statusMessage"], "s");
    }
}
