//! Configuration management.
//!
//! Configuration comes from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `<config_dir>/gugo-engage/config.toml`)
//! 3. Environment variables (a `.env` file is loaded first if present)

mod credentials;

pub use credentials::{
    ApiProviderConfig, ConfigFileProviders, LocalLlmConfig, ProviderSettings, is_placeholder_key,
};

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for gugo-engage.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the `SQLite` database.
    pub data_dir: PathBuf,
    /// Storage root for meme files and generated images.
    pub upload_dir: PathBuf,
    /// HTTP client timeouts for provider calls.
    pub http: HttpConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Per-backend credentials, endpoints, and models.
    pub providers: ProviderSettings,
}

/// HTTP client configuration for provider calls.
///
/// The matching engine itself never sets a deadline; these client-level
/// timeouts bound how long an unresponsive provider can stall a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Logging settings as read from config.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format: `pretty`, `compact`, or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `gugo_engage=debug`.
    pub filter: Option<String>,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Upload directory.
    pub upload_dir: Option<String>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Provider sections.
    pub providers: Option<ConfigFileProviders>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHttp {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".gugo"),
            upload_dir: PathBuf::from("storage"),
            http: HttpConfig::default(),
            logging: LoggingSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents).map(Self::with_env_overrides)
    }

    /// Parses configuration from TOML text without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the text is not valid config TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("invalid config file: {e}")))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Uses `<config_dir>/gugo-engage/config.toml` when it exists, defaults
    /// otherwise. Environment overrides are always applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the default file exists but cannot
    /// be read or parsed.
    pub fn load_default() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::load_if_present(Self::default_config_path().as_deref())
    }

    /// Loads an explicit path if given, otherwise the default location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the selected file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let _ = dotenvy::dotenv();
                Self::load_from_file(path)
            },
            None => Self::load_default(),
        }
    }

    /// Loads `path` when it exists; a missing file means defaults.
    fn load_if_present(path: Option<&Path>) -> Result<Self> {
        match path.filter(|path| path.exists()) {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default().with_env_overrides()),
        }
    }

    /// Returns `<config_dir>/gugo-engage/config.toml`.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("gugo-engage").join("config.toml"))
    }

    /// Converts a `ConfigFile` to `AppConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(upload_dir) = file.upload_dir {
            config.upload_dir = PathBuf::from(upload_dir);
        }
        if let Some(http) = file.http {
            if let Some(timeout_ms) = http.timeout_ms {
                config.http.timeout_ms = timeout_ms;
            }
            if let Some(connect_timeout_ms) = http.connect_timeout_ms {
                config.http.connect_timeout_ms = connect_timeout_ms;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                format: logging.format,
                filter: logging.filter,
                file: logging.file.map(PathBuf::from),
            };
        }
        if let Some(providers) = file.providers {
            config.providers = ProviderSettings::from_config_file(providers);
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_var("GUGO_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(timeout_ms) = env_var("GUGO_LLM_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.http.timeout_ms = timeout_ms;
        }
        if let Some(connect_timeout_ms) =
            env_var("GUGO_LLM_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok())
        {
            self.http.connect_timeout_ms = connect_timeout_ms;
        }
        if let Some(format) = env_var("GUGO_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        self.providers = self.providers.with_env_overrides();
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the upload directory.
    #[must_use]
    pub fn with_upload_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_dir = path.into();
        self
    }

    /// Path of the `SQLite` database.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("gugo.db")
    }

    /// Directory holding meme files.
    #[must_use]
    pub fn memes_dir(&self) -> PathBuf {
        self.upload_dir.join("memes")
    }

    /// Directory receiving generated images.
    #[must_use]
    pub fn generated_images_dir(&self) -> PathBuf {
        self.upload_dir.join("generated_images")
    }
}

/// Reads a non-empty environment variable.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
