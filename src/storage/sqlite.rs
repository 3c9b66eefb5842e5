//! SQLite-backed meme library and settings.

use super::{MemeRepository, SettingsStore};
use crate::models::{
    AdminSettings, ImageProviderKind, Meme, MemeAnalysisModel, MemeId, SETTINGS_ID,
    SettingsUpdate, TextProviderKind,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const MEME_COLUMNS: &str = "id, filename, path, description, tags, analyzed, created_at";

/// `SQLite` storage for memes and admin settings.
pub struct SqliteStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database.
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_data_dir", e))?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::operation("open_db", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::operation("open_db_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memes (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                description TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                analyzed INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memes_created_at ON memes(created_at);
            CREATE TABLE IF NOT EXISTS admin_settings (
                id TEXT PRIMARY KEY,
                text_provider TEXT NOT NULL,
                image_provider TEXT NOT NULL,
                meme_match_model TEXT NOT NULL,
                meme_analysis_model TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )
        .map_err(|e| Error::operation("create_tables", e))
    }

    /// Locks the connection and returns a guard.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::operation("lock_db", e))
    }

    fn query_memes(&self, sql: &str) -> Result<Vec<Meme>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::operation("prepare_list_memes", e))?;
        let rows = stmt
            .query_map([], MemeRow::from_row)
            .map_err(|e| Error::operation("list_memes", e))?;

        rows.map(|row| {
            row.map(MemeRow::into_meme)
                .map_err(|e| Error::operation("read_meme_row", e))
        })
        .collect()
    }

    fn query_meme(&self, sql: &str, key: &str) -> Result<Option<Meme>> {
        let conn = self.lock_conn()?;
        conn.query_row(sql, params![key], MemeRow::from_row)
            .optional()
            .map(|row| row.map(MemeRow::into_meme))
            .map_err(|e| Error::operation("get_meme", e))
    }

    fn read_settings(conn: &Connection) -> Result<Option<AdminSettings>> {
        let row = conn
            .query_row(
                "SELECT text_provider, image_provider, meme_match_model, meme_analysis_model, updated_at
                 FROM admin_settings WHERE id = ?1",
                params![SETTINGS_ID],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::operation("get_settings", e))?;

        row.map(|(text, image, matching, analysis, updated_at)| {
            Ok(AdminSettings {
                text_provider: TextProviderKind::parse(&text)?,
                image_provider: ImageProviderKind::parse(&image)?,
                meme_match_model: TextProviderKind::parse(&matching)?,
                meme_analysis_model: MemeAnalysisModel::parse(&analysis)?,
                updated_at: from_millis(updated_at),
            })
        })
        .transpose()
    }

    fn write_settings(conn: &Connection, settings: &AdminSettings) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO admin_settings
             (id, text_provider, image_provider, meme_match_model, meme_analysis_model, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                SETTINGS_ID,
                settings.text_provider.as_str(),
                settings.image_provider.as_str(),
                settings.meme_match_model.as_str(),
                settings.meme_analysis_model.as_str(),
                settings.updated_at.timestamp_millis(),
            ],
        )
        .map_err(|e| Error::operation("save_settings", e))?;
        Ok(())
    }
}

impl MemeRepository for SqliteStore {
    fn list_all(&self) -> Result<Vec<Meme>> {
        self.query_memes(&format!(
            "SELECT {MEME_COLUMNS} FROM memes ORDER BY created_at DESC, rowid DESC"
        ))
    }

    fn list_unanalyzed(&self) -> Result<Vec<Meme>> {
        self.query_memes(&format!(
            "SELECT {MEME_COLUMNS} FROM memes WHERE analyzed = 0 ORDER BY created_at DESC, rowid DESC"
        ))
    }

    fn get(&self, id: &MemeId) -> Result<Option<Meme>> {
        self.query_meme(
            &format!("SELECT {MEME_COLUMNS} FROM memes WHERE id = ?1"),
            id.as_str(),
        )
    }

    fn find_by_filename(&self, filename: &str) -> Result<Option<Meme>> {
        self.query_meme(
            &format!("SELECT {MEME_COLUMNS} FROM memes WHERE filename = ?1"),
            filename,
        )
    }

    fn insert(&self, meme: &Meme) -> Result<()> {
        let tags_json = serialize_tags(&meme.tags)?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO memes (id, filename, path, description, tags, analyzed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                meme.id.as_str(),
                meme.filename,
                meme.path,
                meme.description,
                tags_json,
                meme.analyzed,
                meme.created_at.timestamp_millis(),
            ],
        )
        .map_err(|e| Error::operation("insert_meme", e))?;
        Ok(())
    }

    fn update(&self, meme: &Meme) -> Result<()> {
        let tags_json = serialize_tags(&meme.tags)?;
        let conn = self.lock_conn()?;
        let changed = conn
            .execute(
                "UPDATE memes SET path = ?2, description = ?3, tags = ?4, analyzed = ?5
                 WHERE id = ?1",
                params![
                    meme.id.as_str(),
                    meme.path,
                    meme.description,
                    tags_json,
                    meme.analyzed,
                ],
            )
            .map_err(|e| Error::operation("update_meme", e))?;

        if changed == 0 {
            return Err(Error::NotFound(format!("meme {}", meme.id)));
        }
        Ok(())
    }

    fn delete(&self, id: &MemeId) -> Result<bool> {
        let conn = self.lock_conn()?;
        let deleted = conn
            .execute("DELETE FROM memes WHERE id = ?1", params![id.as_str()])
            .map_err(|e| Error::operation("delete_meme", e))?;
        Ok(deleted > 0)
    }
}

impl SettingsStore for SqliteStore {
    fn get_or_create_default(&self) -> Result<AdminSettings> {
        let conn = self.lock_conn()?;
        if let Some(settings) = Self::read_settings(&conn)? {
            return Ok(settings);
        }

        let settings = AdminSettings::default();
        Self::write_settings(&conn, &settings)?;
        tracing::info!("Created default admin settings");
        Ok(settings)
    }

    fn update_settings(&self, update: &SettingsUpdate) -> Result<AdminSettings> {
        let conn = self.lock_conn()?;
        let mut settings = Self::read_settings(&conn)?.unwrap_or_default();
        update.apply_to(&mut settings);
        Self::write_settings(&conn, &settings)?;
        Ok(settings)
    }
}

/// Raw column values of one `memes` row.
struct MemeRow {
    id: String,
    filename: String,
    path: String,
    description: Option<String>,
    tags_json: String,
    analyzed: bool,
    created_at: i64,
}

impl MemeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            path: row.get(2)?,
            description: row.get(3)?,
            tags_json: row.get(4)?,
            analyzed: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_meme(self) -> Meme {
        Meme {
            id: MemeId::new(self.id),
            filename: self.filename,
            path: self.path,
            description: self.description,
            tags: serde_json::from_str(&self.tags_json).unwrap_or_default(),
            analyzed: self.analyzed,
            created_at: from_millis(self.created_at),
        }
    }
}

fn serialize_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| Error::operation("serialize_tags", e))
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn meme(id: &str, filename: &str, age_secs: i64) -> Meme {
        let mut meme = Meme::new(filename, format!("/storage/memes/{filename}")).with_id(id);
        meme.created_at = Utc::now() - Duration::seconds(age_secs);
        meme
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let original = meme("a", "a.png", 0)
            .with_description("duck celebrating a win")
            .with_tags(["gugo", "win"]);
        store.insert(&original).unwrap();

        let loaded = store.get(&MemeId::new("a")).unwrap().unwrap();
        assert_eq!(loaded.description.as_deref(), Some("duck celebrating a win"));
        assert_eq!(loaded.tags, vec!["gugo", "win"]);
        assert!(!loaded.analyzed);
        assert_eq!(
            loaded.created_at.timestamp_millis(),
            original.created_at.timestamp_millis()
        );
        assert!(store.get(&MemeId::new("missing")).unwrap().is_none());
    }

    #[test]
    fn test_list_all_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&meme("old", "old.png", 100)).unwrap();
        store.insert(&meme("new", "new.png", 1)).unwrap();
        store.insert(&meme("mid", "mid.png", 50)).unwrap();

        let ids: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_duplicate_filename_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&meme("a", "same.png", 0)).unwrap();
        let result = store.insert(&meme("b", "same.png", 0));
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_update_and_unanalyzed() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&meme("a", "a.png", 0)).unwrap();
        store.insert(&meme("b", "b.png", 0)).unwrap();

        let mut a = store.get(&MemeId::new("a")).unwrap().unwrap();
        a.analyzed = true;
        a.description = Some("analyzed".to_string());
        store.update(&a).unwrap();

        let unanalyzed = store.list_unanalyzed().unwrap();
        assert_eq!(unanalyzed.len(), 1);
        assert_eq!(unanalyzed[0].id.as_str(), "b");

        let missing = meme("zzz", "zzz.png", 0);
        assert!(matches!(store.update(&missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert(&meme("a", "a.png", 0)).unwrap();
        assert!(store.delete(&MemeId::new("a")).unwrap());
        assert!(!store.delete(&MemeId::new("a")).unwrap());
        assert!(store.find_by_filename("a.png").unwrap().is_none());
    }

    #[test]
    fn test_settings_created_once() {
        let store = SqliteStore::in_memory().unwrap();
        let first = store.get_or_create_default().unwrap();
        assert_eq!(first.text_provider, TextProviderKind::Local);
        assert_eq!(first.image_provider, ImageProviderKind::Together);

        let updated = store
            .update_settings(&SettingsUpdate {
                meme_match_model: Some(TextProviderKind::DeepSeek),
                ..SettingsUpdate::default()
            })
            .unwrap();
        assert_eq!(updated.meme_match_model, TextProviderKind::DeepSeek);

        let reread = store.get_or_create_default().unwrap();
        assert_eq!(reread.meme_match_model, TextProviderKind::DeepSeek);
        assert_eq!(reread.text_provider, TextProviderKind::Local);
    }

    #[test]
    fn test_unknown_stored_provider_is_configuration_error() {
        let store = SqliteStore::in_memory().unwrap();
        store.get_or_create_default().unwrap();
        store
            .lock_conn()
            .unwrap()
            .execute("UPDATE admin_settings SET text_provider = 'grok'", [])
            .unwrap();
        assert!(matches!(
            store.get_or_create_default(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gugo.db");
        {
            let store = SqliteStore::new(&path).unwrap();
            store.insert(&meme("a", "a.png", 0)).unwrap();
        }
        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.db_path(), path);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }
}
