//! Reply suggestion prompts and parsing.

use super::CompletionRequest;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 3;

/// Returned when the model output contains no numbered lines.
pub const FALLBACK_SUGGESTION: &str = "Great point! Thanks for sharing your perspective.";

/// Sampling temperature for reply generation.
pub const REPLY_TEMPERATURE: f32 = 0.8;

/// Token limit for reply generation.
pub const REPLY_MAX_TOKENS: u32 = 500;

const REPLY_SYSTEM_PROMPT: &str = "\
You are a social media engagement expert helping to create compelling Twitter/X replies.
Generate authentic, engaging responses that:
- Are conversational and natural
- Add value to the discussion
- Are appropriate in tone and content
- Stay under 280 characters
- Don't include hashtags unless absolutely relevant
- Show genuine interest or provide helpful insights

Generate exactly 3 different reply options with varying approaches (supportive, insightful, engaging).";

/// Leading `<digits>.` numbering on a suggestion line.
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").unwrap_or_else(|_| unreachable!()));

/// Builds the completion request for reply suggestions.
#[must_use]
pub fn reply_request(tweet_text: &str, tweet_author: &str) -> CompletionRequest {
    let user = format!(
        "Create engaging reply options for this tweet by @{tweet_author}:\n\n\
         \"{tweet_text}\"\n\n\
         Return exactly 3 reply options, each on a separate line, numbered 1-3."
    );
    CompletionRequest::new(user)
        .with_system(REPLY_SYSTEM_PROMPT)
        .with_temperature(REPLY_TEMPERATURE)
        .with_max_tokens(REPLY_MAX_TOKENS)
}

/// Extracts numbered suggestions from model output.
///
/// Keeps lines that start with `<digits>.`, strips the numbering, drops
/// empties, and returns at most [`MAX_SUGGESTIONS`]. Falls back to
/// [`FALLBACK_SUGGESTION`] when nothing survives.
#[must_use]
pub fn parse_reply_suggestions(content: &str) -> Vec<String> {
    let suggestions: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| NUMBERED_LINE.is_match(line))
        .map(|line| NUMBERED_LINE.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect();

    if suggestions.is_empty() {
        vec![FALLBACK_SUGGESTION.to_string()]
    } else {
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_request_shape() {
        let request = reply_request("gm frens", "gugo");
        assert!(request.user.contains("tweet by @gugo"));
        assert!(request.user.contains("\"gm frens\""));
        assert!(
            request
                .system
                .as_deref()
                .is_some_and(|s| s.contains("exactly 3 different reply options"))
        );
        assert_eq!(request.max_tokens, REPLY_MAX_TOKENS);
    }

    #[test]
    fn test_parse_strips_numbering() {
        let content = "Here you go:\n1. Love this!\n2.   So true\n  3. Big if true\n";
        assert_eq!(
            parse_reply_suggestions(content),
            vec!["Love this!", "So true", "Big if true"]
        );
    }

    #[test]
    fn test_parse_caps_at_three() {
        let content = "1. a\n2. b\n3. c\n4. d\n5. e";
        assert_eq!(parse_reply_suggestions(content).len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_parse_skips_empty_numbered_lines() {
        let content = "1.\n2. kept\n10. also kept";
        assert_eq!(parse_reply_suggestions(content), vec!["kept", "also kept"]);
    }

    #[test]
    fn test_parse_fallback() {
        assert_eq!(
            parse_reply_suggestions("- bullet\n* star"),
            vec![FALLBACK_SUGGESTION]
        );
        assert_eq!(parse_reply_suggestions(""), vec![FALLBACK_SUGGESTION]);
    }
}
