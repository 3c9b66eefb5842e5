//! Meme analysis service.
//!
//! Fills in description and tags for memes using the vision backend chosen
//! by `memeAnalysisModel`. Batch runs keep going past individual failures.

use crate::config::AppConfig;
use crate::models::{Meme, MemeId};
use crate::services::provider_factory::{ProviderFactory, ProviderResolver};
use crate::storage::{MemeRepository, SettingsStore, SqliteStore};
use crate::vision::{MemeAnalysis, MemeAnalyzer};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Outcome for one meme in a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Meme ID.
    pub id: MemeId,
    /// Meme filename.
    pub filename: String,
    /// The analysis, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MemeAnalysis>,
    /// Why the meme was not analyzed, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    /// Memes analyzed and saved.
    pub analyzed: usize,
    /// Memes skipped because of an error.
    pub failed: usize,
    /// Per-meme outcomes in processing order.
    pub results: Vec<AnalysisRecord>,
}

/// Runs vision analysis over the meme library.
pub struct MemeAnalysisService {
    memes: Arc<dyn MemeRepository>,
    settings: Arc<dyn SettingsStore>,
    providers: Arc<dyn ProviderResolver>,
}

impl MemeAnalysisService {
    /// Creates the service.
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
        }
    }

    /// Creates the service backed by the configured `SQLite` database.
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

    /// Analyzes one meme and saves the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the meme or its file is missing, or
    /// the analyzer's error if analysis fails.
    #[instrument(skip(self), fields(operation = "meme_analyze"))]
    pub fn analyze_one(&self, id: &MemeId) -> Result<(Meme, MemeAnalysis)> {
        let meme = self
            .memes
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("meme {id}")))?;
        let analyzer = self.analyzer()?;
        self.analyze_and_save(analyzer.as_ref(), meme)
    }

    /// Analyzes every meme not yet analyzed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the library or settings cannot be read;
    /// per-meme failures are counted in the returned stats.
    #[instrument(skip(self), fields(operation = "meme_analyze_all"))]
    pub fn analyze_all(&self) -> Result<AnalysisStats> {
        let pending = self.memes.list_unanalyzed()?;
        if pending.is_empty() {
            tracing::info!("No unanalyzed memes found");
            return Ok(AnalysisStats::default());
        }

        let analyzer = self.analyzer()?;
        tracing::info!(
            analyzer = analyzer.name(),
            pending = pending.len(),
            "Starting batch analysis"
        );

        let mut stats = AnalysisStats::default();
        for meme in pending {
            let id = meme.id.clone();
            let filename = meme.filename.clone();
            match self.analyze_and_save(analyzer.as_ref(), meme) {
                Ok((_, analysis)) => {
                    stats.analyzed += 1;
                    stats.results.push(AnalysisRecord {
                        id,
                        filename,
                        analysis: Some(analysis),
                        error: None,
                    });
                },
                Err(e) => {
                    tracing::warn!(meme = %id, filename = %filename, error = %e, "Meme analysis failed");
                    stats.failed += 1;
                    stats.results.push(AnalysisRecord {
                        id,
                        filename,
                        analysis: None,
                        error: Some(e.to_string()),
                    });
                },
            }
        }

        tracing::info!(
            analyzed = stats.analyzed,
            failed = stats.failed,
            "Batch analysis complete"
        );
        Ok(stats)
    }

    fn analyzer(&self) -> Result<Box<dyn MemeAnalyzer>> {
        let model = self.settings.get_or_create_default()?.meme_analysis_model;
        Ok(self.providers.analyzer(model))
    }

    fn analyze_and_save(
        &self,
        analyzer: &dyn MemeAnalyzer,
        mut meme: Meme,
    ) -> Result<(Meme, MemeAnalysis)> {
        let image_path = Path::new(&meme.path);
        if !image_path.is_file() {
            return Err(Error::NotFound(format!(
                "image file {}",
                image_path.display()
            )));
        }

        let result = analyzer.analyze_meme(image_path, &meme.filename);
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "meme_analysis_total",
            "analyzer" => analyzer.name(),
            "status" => status
        )
        .increment(1);
        let analysis = result?;

        meme.description = Some(analysis.description.clone());
        meme.tags.clone_from(&analysis.tags);
        meme.analyzed = true;
        self.memes.update(&meme)?;

        tracing::debug!(
            meme = %meme.id,
            analyzer = analyzer.name(),
            status = %analysis.status_message,
            "Meme analyzed"
        );
        Ok((meme, analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageProvider;
    use crate::llm::LlmProvider;
    use crate::models::{ImageProviderKind, MemeAnalysisModel, SettingsUpdate, TextProviderKind};
    use crate::vision::FilenameAnalyzer;
    use std::fs;

    struct Resolver;

    impl ProviderResolver for Resolver {
        fn text_provider(&self, _kind: TextProviderKind) -> Box<dyn LlmProvider> {
            unreachable!("text provider not used")
        }

        fn image_provider(&self, _kind: ImageProviderKind) -> Box<dyn ImageProvider> {
            unreachable!("image provider not used")
        }

        fn analyzer(&self, model: MemeAnalysisModel) -> Box<dyn MemeAnalyzer> {
            assert_eq!(model, MemeAnalysisModel::DeepSeek);
            Box::new(FilenameAnalyzer::new())
        }
    }

    fn setup() -> (tempfile::TempDir, Arc<SqliteStore>, MemeAnalysisService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .update_settings(&SettingsUpdate {
                meme_analysis_model: Some(MemeAnalysisModel::DeepSeek),
                ..SettingsUpdate::default()
            })
            .unwrap();
        let svc = MemeAnalysisService::new(store.clone(), store.clone(), Arc::new(Resolver));
        (dir, store, svc)
    }

    fn add_meme(store: &SqliteStore, dir: &Path, id: &str, filename: &str, on_disk: bool) -> Meme {
        let path = dir.join(filename);
        if on_disk {
            fs::write(&path, b"png").unwrap();
        }
        let meme = Meme::new(filename, path.to_string_lossy()).with_id(id);
        store.insert(&meme).unwrap();
        meme
    }

    #[test]
    fn test_analyze_one_saves_result() {
        let (dir, store, svc) = setup();
        add_meme(&store, dir.path(), "m1", "happy_duck.png", true);

        let (meme, analysis) = svc.analyze_one(&MemeId::new("m1")).unwrap();
        assert!(meme.analyzed);
        assert!(!analysis.is_actual_ai);
        assert_eq!(analysis.description, "Meme image: happy duck");

        let stored = store.get(&MemeId::new("m1")).unwrap().unwrap();
        assert!(stored.analyzed);
        assert_eq!(stored.tags, analysis.tags);
    }

    #[test]
    fn test_analyze_one_not_found() {
        let (dir, store, svc) = setup();
        assert!(matches!(
            svc.analyze_one(&MemeId::new("nope")),
            Err(Error::NotFound(_))
        ));

        add_meme(&store, dir.path(), "gone", "gone.png", false);
        assert!(matches!(
            svc.analyze_one(&MemeId::new("gone")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_analyze_all_continues_past_failures() {
        let (dir, store, svc) = setup();
        add_meme(&store, dir.path(), "a", "rocket_moon.png", true);
        add_meme(&store, dir.path(), "b", "missing.png", false);
        add_meme(&store, dir.path(), "c", "sad_frog.gif", true);

        let stats = svc.analyze_all().unwrap();
        assert_eq!(stats.analyzed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.results.len(), 3);

        let failed: Vec<&str> = stats
            .results
            .iter()
            .filter(|r| r.error.is_some())
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(failed, vec!["b"]);

        let remaining = store.list_unanalyzed().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_str(), "b");
    }

    #[test]
    fn test_analyze_all_with_nothing_pending() {
        let (_dir, _store, svc) = setup();
        assert_eq!(svc.analyze_all().unwrap(), AnalysisStats::default());
    }
}
