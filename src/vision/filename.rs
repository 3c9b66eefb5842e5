//! Filename-derived analysis for backends without a vision endpoint.

use super::{MemeAnalysis, MemeAnalyzer, normalize_tags};
use crate::Result;
use std::path::Path;

/// Words that never make useful tags.
const NOISE_WORDS: &[&str] = &[
    "img", "image", "meme", "copy", "final", "edit", "new", "the", "and", "for", "with",
];

/// Derives a description and tags from the filename alone.
///
/// Used for `DeepSeek`, which exposes no image input. Results are marked
/// with `is_actual_ai = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameAnalyzer;

impl FilenameAnalyzer {
    /// Creates the analyzer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Splits a filename stem into lowercase words.
    fn words(filename: &str) -> Vec<String> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(filename);

        stem.split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.chars().count() > 2)
            .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_lowercase)
            .filter(|word| !NOISE_WORDS.contains(&word.as_str()))
            .collect()
    }
}

impl MemeAnalyzer for FilenameAnalyzer {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn analyze_meme(&self, _image_path: &Path, filename: &str) -> Result<MemeAnalysis> {
        let words = Self::words(filename);
        let description = if words.is_empty() {
            "Meme image".to_string()
        } else {
            format!("Meme image: {}", words.join(" "))
        };

        let mut tags = normalize_tags(&words);
        if !tags.iter().any(|tag| tag == "meme") {
            tags.push("meme".to_string());
        }

        Ok(MemeAnalysis {
            description,
            tags,
            is_actual_ai: false,
            status_message: "DeepSeek has no vision input; generated from filename".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_from_filename() {
        assert_eq!(
            FilenameAnalyzer::words("gugo_duck-celebrating 2024.png"),
            vec!["gugo", "duck", "celebrating"]
        );
        assert!(FilenameAnalyzer::words("IMG_0001.jpg").is_empty());
    }

    #[test]
    fn test_analysis_is_not_ai() {
        let analysis = FilenameAnalyzer::new()
            .analyze_meme(Path::new("unused"), "sad_duck.gif")
            .unwrap();
        assert_eq!(analysis.description, "Meme image: sad duck");
        assert_eq!(analysis.tags, vec!["sad", "duck", "meme"]);
        assert!(!analysis.is_actual_ai);
    }

    #[test]
    fn test_opaque_filename() {
        let analysis = FilenameAnalyzer::new()
            .analyze_meme(Path::new("unused"), "12345.png")
            .unwrap();
        assert_eq!(analysis.description, "Meme image");
        assert_eq!(analysis.tags, vec!["meme"]);
    }
}
