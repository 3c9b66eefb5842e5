//! Storage traits consumed by the services.

use crate::Result;
use crate::models::{AdminSettings, Meme, MemeId, SettingsUpdate};

/// Trait for meme library storage.
pub trait MemeRepository: Send + Sync {
    /// Lists every meme, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn list_all(&self) -> Result<Vec<Meme>>;

    /// Lists memes not yet analyzed, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn list_unanalyzed(&self) -> Result<Vec<Meme>>;

    /// Gets a meme by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn get(&self, id: &MemeId) -> Result<Option<Meme>>;

    /// Gets a meme by filename.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn find_by_filename(&self, filename: &str) -> Result<Option<Meme>>;

    /// Inserts a new meme.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID or filename is already taken.
    fn insert(&self, meme: &Meme) -> Result<()>;

    /// Replaces an existing meme's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no meme has this ID.
    fn update(&self, meme: &Meme) -> Result<()>;

    /// Deletes a meme record.
    ///
    /// Returns true if a record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn delete(&self, id: &MemeId) -> Result<bool>;
}

/// Trait for the singleton admin settings record.
pub trait SettingsStore: Send + Sync {
    /// Returns the settings, creating the default record on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read, or
    /// [`crate::Error::Configuration`] if a stored provider name is unknown.
    fn get_or_create_default(&self) -> Result<AdminSettings>;

    /// Applies a partial update and returns the new settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn update_settings(&self, update: &SettingsUpdate) -> Result<AdminSettings>;
}
