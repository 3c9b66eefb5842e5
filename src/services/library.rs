//! Meme library management.

use crate::config::{AppConfig, HttpConfig};
use crate::llm::build_http_client;
use crate::models::{Meme, MemeId};
use crate::storage::{MemeRepository, SqliteStore};
use crate::{Error, Result};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// File extensions accepted on import.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Content types accepted for downloads whose URL has no file extension.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Changes to a meme's metadata; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemeEdit {
    /// New description; an empty string clears it.
    pub description: Option<String>,
    /// Replacement tag list.
    pub tags: Option<Vec<String>>,
}

impl MemeEdit {
    /// Returns true if the edit changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.tags.is_none()
    }
}

/// Imports, edits, and removes memes and their backing files.
pub struct MemeLibrary {
    memes: Arc<dyn MemeRepository>,
    memes_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl MemeLibrary {
    /// Creates a library storing files under `memes_dir`.
    #[must_use]
    pub fn new(memes: Arc<dyn MemeRepository>, memes_dir: impl Into<PathBuf>) -> Self {
        Self {
            memes,
            memes_dir: memes_dir.into(),
            client: build_http_client(HttpConfig::default()),
        }
    }

    /// Sets the timeouts used by [`Self::import_url`].
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Creates a library from the application config.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(SqliteStore::new(config.database_path())?),
            config.memes_dir(),
        )
        .with_http_config(config.http))
    }

    /// Lists every meme, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn list(&self) -> Result<Vec<Meme>> {
        self.memes.list_all()
    }

    /// Gets a meme by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no meme has this ID.
    pub fn get(&self, id: &MemeId) -> Result<Meme> {
        self.memes
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("meme {id}")))
    }

    /// Copies an image into the library and records it as unanalyzed.
    ///
    /// The stored name keeps the source stem and appends a millisecond
    /// timestamp, so re-importing the same file never collides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the source is missing,
    /// [`Error::InvalidInput`] for an unsupported extension, and
    /// [`Error::OperationFailed`] if the copy or insert fails.
    #[instrument(skip(self), fields(operation = "meme_import"))]
    pub fn import(&self, source: &Path) -> Result<Meme> {
        if !source.is_file() {
            return Err(Error::NotFound(format!("file {}", source.display())));
        }
        let extension = allowed_extension(source).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unsupported image type: {} (allowed: {})",
                source.display(),
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        self.store(&sanitized_stem(source), &extension, |target| {
            fs::copy(source, target).map(|_| ())
        })
    }

    /// Downloads an image over HTTP(S) into the library.
    ///
    /// The extension comes from the URL path, or from the `Content-Type`
    /// header when the path has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a malformed or non-HTTP URL, an
    /// unsupported image type, or an empty body, and
    /// [`Error::OperationFailed`] if the download or write fails.
    #[instrument(skip(self), fields(operation = "meme_import_url"))]
    pub fn import_url(&self, url: &str) -> Result<Meme> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| Error::InvalidInput(format!("invalid URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let name = Path::new(
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default(),
        )
        .to_path_buf();
        let from_path = allowed_extension(&name);
        if from_path.is_none() && name.extension().is_some() {
            return Err(unsupported_type(url));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .map_err(|e| Error::operation("fetch_meme", format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::operation(
                "fetch_meme",
                format!("{url}: server returned {status}"),
            ));
        }

        let extension = match from_path {
            Some(extension) => extension,
            None => response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(extension_for_content_type)
                .ok_or_else(|| unsupported_type(url))?
                .to_string(),
        };

        let bytes = response
            .bytes()
            .map_err(|e| Error::operation("fetch_meme", format!("{url}: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::InvalidInput(format!("empty download from {url}")));
        }

        tracing::debug!(url, bytes = bytes.len(), "Downloaded meme");
        self.store(&sanitized_stem(&name), &extension, |target| {
            fs::write(target, &bytes)
        })
    }

    /// Writes a new file into the library and records it as unanalyzed.
    ///
    /// The file is removed again if the record cannot be inserted.
    fn store(
        &self,
        stem: &str,
        extension: &str,
        write: impl FnOnce(&Path) -> std::io::Result<()>,
    ) -> Result<Meme> {
        fs::create_dir_all(&self.memes_dir).map_err(|e| {
            Error::operation("create_memes_dir", format!("{}: {e}", self.memes_dir.display()))
        })?;

        let filename = self.unique_filename(stem, extension);
        let target = self.memes_dir.join(&filename);
        write(&target)
            .map_err(|e| Error::operation("write_meme", format!("{}: {e}", target.display())))?;

        let meme = Meme::new(filename, target.to_string_lossy());
        if let Err(e) = self.memes.insert(&meme) {
            let _ = fs::remove_file(&target);
            return Err(e);
        }

        tracing::info!(meme = %meme.id, filename = %meme.filename, "Imported meme");
        Ok(meme)
    }

    /// Updates description and/or tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty edit or a blank tag, and
    /// [`Error::NotFound`] if no meme has this ID.
    pub fn edit(&self, id: &MemeId, edit: &MemeEdit) -> Result<Meme> {
        if edit.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }
        let mut meme = self.get(id)?;

        if let Some(description) = &edit.description {
            let description = description.trim();
            meme.description = (!description.is_empty()).then(|| description.to_string());
        }
        if let Some(tags) = &edit.tags {
            meme.tags = clean_tags(tags)?;
        }

        self.memes.update(&meme)?;
        tracing::debug!(meme = %meme.id, "Edited meme");
        Ok(meme)
    }

    /// Marks a meme as needing analysis again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no meme has this ID.
    pub fn reset(&self, id: &MemeId) -> Result<Meme> {
        let mut meme = self.get(id)?;
        meme.analyzed = false;
        self.memes.update(&meme)?;
        Ok(meme)
    }

    /// Deletes a meme record and its backing file.
    ///
    /// A backing file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no meme has this ID, or
    /// [`Error::OperationFailed`] if the file cannot be removed.
    #[instrument(skip(self), fields(operation = "meme_delete"))]
    pub fn delete(&self, id: &MemeId) -> Result<Meme> {
        let meme = self.get(id)?;

        let path = Path::new(&meme.path);
        if path.exists() {
            fs::remove_file(path)
                .map_err(|e| Error::operation("remove_meme_file", format!("{}: {e}", path.display())))?;
        }
        self.memes.delete(id)?;

        tracing::info!(meme = %meme.id, filename = %meme.filename, "Deleted meme");
        Ok(meme)
    }

    fn unique_filename(&self, stem: &str, extension: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut filename = format!("{stem}-{millis}.{extension}");
        let mut n = 1;
        while self.memes_dir.join(&filename).exists() {
            filename = format!("{stem}-{millis}-{n}.{extension}");
            n += 1;
        }
        filename
    }
}

/// Lowercased extension, if it is one of [`ALLOWED_EXTENSIONS`].
fn allowed_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == mime)
        .map(|(_, extension)| *extension)
}

fn unsupported_type(url: &str) -> Error {
    Error::InvalidInput(format!(
        "unsupported image type: {url} (allowed: {})",
        ALLOWED_EXTENSIONS.join(", ")
    ))
}

/// Lowercased stem with anything outside `[a-z0-9_-]` replaced by `_`.
fn sanitized_stem(source: &Path) -> String {
    let stem: String = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "meme".to_string()
    } else {
        stem.to_string()
    }
}

fn clean_tags(tags: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(Error::InvalidInput("tags must not be blank".to_string()));
        }
        if !out.iter().any(|existing| existing == tag) {
            out.push(tag.to_string());
        }
    }
    Ok(out)
}
