//! Composite image service.

use crate::config::AppConfig;
use crate::models::ImageProviderKind;
use crate::services::provider_factory::{ProviderFactory, ProviderResolver};
use crate::storage::{SettingsStore, SqliteStore};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// A generated image written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Where the PNG was written.
    pub path: PathBuf,
    /// Backend selected by `imageProvider`.
    pub provider: ImageProviderKind,
}

/// Generates images through the configured backend and stores them.
///
/// There is no fallback strategy; provider errors reach the caller.
pub struct ImageService {
    settings: Arc<dyn SettingsStore>,
    providers: Arc<dyn ProviderResolver>,
    output_dir: PathBuf,
}

impl ImageService {
    /// Creates the service writing into `output_dir`.
    #[must_use]
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        providers: Arc<dyn ProviderResolver>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            providers,
            output_dir: output_dir.into(),
        }
    }

    /// Creates the service from the application config.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(SqliteStore::new(config.database_path())?),
            Arc::new(ProviderFactory::from_config(config)),
            config.generated_images_dir(),
        ))
    }

    /// Generates one image and writes it as `generated_<millis>_<suffix>.png`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank prompt,
    /// [`Error::NotFound`] for a missing base image, [`Error::Provider`] if
    /// generation fails or returns undecodable data, and
    /// [`Error::OperationFailed`] if the file cannot be written.
    #[instrument(skip(self, prompt), fields(operation = "image_generate"))]
    pub fn generate(&self, prompt: &str, base_image: Option<&Path>) -> Result<GeneratedImage> {
        if prompt.trim().is_empty() {
            return Err(Error::InvalidInput("prompt is required".to_string()));
        }
        if let Some(path) = base_image.filter(|path| !path.exists()) {
            return Err(Error::NotFound(format!("base image {}", path.display())));
        }

        let kind = self.settings.get_or_create_default()?.image_provider;
        let provider = self.providers.image_provider(kind);

        let start = Instant::now();
        let result = provider
            .generate_composite(prompt, base_image)
            .and_then(|payload| decode_payload(kind, &payload));

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "image_generation_total",
            "provider" => kind.as_str(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("image_generation_duration_ms", "provider" => kind.as_str())
            .record(start.elapsed().as_secs_f64() * 1000.0);

        let bytes = result?;
        let path = self.write_image(&bytes)?;
        tracing::info!(
            provider = kind.as_str(),
            path = %path.display(),
            bytes = bytes.len(),
            "Generated image"
        );
        Ok(GeneratedImage {
            path,
            provider: kind,
        })
    }

    fn write_image(&self, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::operation(
                "create_generated_dir",
                format!("{}: {e}", self.output_dir.display()),
            )
        })?;
        let path = self.output_dir.join(generated_filename());
        fs::write(&path, bytes)
            .map_err(|e| Error::operation("write_image", format!("{}: {e}", path.display())))?;
        Ok(path)
    }
}

/// Returns `generated_<millis>_<suffix>.png`.
fn generated_filename() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "generated_{}_{}.png",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..6]
    )
}

/// Decodes a base64 payload, tolerating a `data:` URL prefix.
fn decode_payload(kind: ImageProviderKind, payload: &str) -> Result<Vec<u8>> {
    let encoded = payload
        .split_once(";base64,")
        .map_or(payload, |(_, data)| data)
        .trim();
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| Error::provider(kind.as_str(), format!("invalid base64 image: {e}")))?;
    if bytes.is_empty() {
        return Err(Error::provider(kind.as_str(), "empty image payload"));
    }
    Ok(bytes)
}
