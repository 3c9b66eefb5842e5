//! Reply suggestion service.

use crate::config::AppConfig;
use crate::models::TextProviderKind;
use crate::services::provider_factory::{ProviderFactory, ProviderResolver};
use crate::storage::{SettingsStore, SqliteStore};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Reply suggestions plus the backend that wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplySuggestions {
    /// One to three suggestions.
    pub suggestions: Vec<String>,
    /// Backend selected by `textProvider`.
    pub provider: TextProviderKind,
}

/// Drafts replies through the configured text provider.
///
/// Unlike matching there is no fallback: provider errors reach the caller.
pub struct ReplyService {
    settings: Arc<dyn SettingsStore>,
    providers: Arc<dyn ProviderResolver>,
}

impl ReplyService {
    /// Creates the service.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, providers: Arc<dyn ProviderResolver>) -> Self {
        Self {
            settings,
            providers,
        }
    }

    /// Creates the service backed by the configured `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(SqliteStore::new(config.database_path())?),
            Arc::new(ProviderFactory::from_config(config)),
        ))
    }

    /// Generates reply suggestions for a tweet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if text or author is blank, and
    /// [`Error::Provider`] if the backend call fails.
    #[instrument(skip(self, tweet_text), fields(operation = "reply_generate"))]
    pub fn generate(&self, tweet_text: &str, author: &str) -> Result<ReplySuggestions> {
        let author = author.trim().trim_start_matches('@');
        if tweet_text.trim().is_empty() || author.is_empty() {
            return Err(Error::InvalidInput(
                "tweet text and author are required".to_string(),
            ));
        }

        let kind = self.settings.get_or_create_default()?.text_provider;
        let provider = self.providers.text_provider(kind);
        let result = provider.generate_reply(tweet_text, author);

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "reply_generation_total",
            "provider" => kind.as_str(),
            "status" => status
        )
        .increment(1);

        let suggestions = result?;
        tracing::info!(
            provider = kind.as_str(),
            count = suggestions.len(),
            "Generated reply suggestions"
        );
        Ok(ReplySuggestions {
            suggestions,
            provider: kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageProvider;
    use crate::llm::{CompletionRequest, FALLBACK_SUGGESTION, LlmProvider};
    use crate::models::{ImageProviderKind, MemeAnalysisModel, SettingsUpdate};
    use crate::vision::{FilenameAnalyzer, MemeAnalyzer};
    use std::sync::Mutex;

    struct CannedLlm(std::result::Result<&'static str, ()>);

    impl LlmProvider for CannedLlm {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|()| Error::provider("canned", "boom"))
        }
    }

    struct Resolver {
        answer: std::result::Result<&'static str, ()>,
        asked: Mutex<Vec<TextProviderKind>>,
    }

    impl ProviderResolver for Resolver {
        fn text_provider(&self, kind: TextProviderKind) -> Box<dyn LlmProvider> {
            self.asked.lock().unwrap().push(kind);
            Box::new(CannedLlm(self.answer))
        }

        fn image_provider(&self, _kind: ImageProviderKind) -> Box<dyn ImageProvider> {
            unreachable!("image provider not used")
        }

        fn analyzer(&self, _model: MemeAnalysisModel) -> Box<dyn MemeAnalyzer> {
            Box::new(FilenameAnalyzer::new())
        }
    }

    fn service(answer: std::result::Result<&'static str, ()>) -> (ReplyService, Arc<Resolver>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .update_settings(&SettingsUpdate {
                text_provider: Some(TextProviderKind::Anthropic),
                ..SettingsUpdate::default()
            })
            .unwrap();
        let resolver = Arc::new(Resolver {
            answer,
            asked: Mutex::new(Vec::new()),
        });
        (ReplyService::new(store, resolver.clone()), resolver)
    }

    #[test]
    fn test_uses_text_provider_setting() {
        let (svc, resolver) = service(Ok("1. one\n2. two\n3. three\n4. four"));
        let replies = svc.generate("we shipped", "@gugo").unwrap();

        assert_eq!(replies.suggestions, vec!["one", "two", "three"]);
        assert_eq!(replies.provider, TextProviderKind::Anthropic);
        assert_eq!(*resolver.asked.lock().unwrap(), vec![TextProviderKind::Anthropic]);
    }

    #[test]
    fn test_unparseable_output_falls_back() {
        let (svc, _) = service(Ok("Sure! Here are some ideas."));
        let replies = svc.generate("we shipped", "gugo").unwrap();
        assert_eq!(replies.suggestions, vec![FALLBACK_SUGGESTION]);
    }

    #[test]
    fn test_provider_error_propagates() {
        let (svc, _) = service(Err(()));
        let err = svc.generate("we shipped", "gugo").unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn test_blank_input_rejected() {
        let (svc, resolver) = service(Ok("1. x"));
        assert!(matches!(svc.generate("  ", "gugo"), Err(Error::InvalidInput(_))));
        assert!(matches!(svc.generate("hi", "@"), Err(Error::InvalidInput(_))));
        assert!(resolver.asked.lock().unwrap().is_empty());
    }
}
