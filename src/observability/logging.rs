//! Log output settings.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human output.
    Pretty,
    /// Single-line human output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub filter: String,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Resolves settings against the environment.
    ///
    /// The filter comes from `GUGO_LOG`, then `RUST_LOG`, then the config
    /// file, then `info` (`gugo_engage=debug` when `verbose`).
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let env_filter = ["GUGO_LOG", "RUST_LOG"]
            .into_iter()
            .find_map(crate::config::env_var);
        Self::resolve(settings, env_filter, verbose)
    }

    fn resolve(settings: &LoggingSettings, env_filter: Option<String>, verbose: bool) -> Self {
        let format = settings.format.as_deref().map_or_else(LogFormat::default, |name| {
            LogFormat::parse(name).unwrap_or_else(|| {
                tracing::warn!(format = name, "Unknown log format, using compact");
                LogFormat::default()
            })
        });
        let filter = env_filter
            .or_else(|| settings.filter.clone())
            .unwrap_or_else(|| {
                if verbose {
                    "info,gugo_engage=debug".to_string()
                } else {
                    "info".to_string()
                }
            });

        Self {
            format,
            filter,
            file: settings.file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("pretty", Some(LogFormat::Pretty))]
    #[test_case("JSON", Some(LogFormat::Json))]
    #[test_case("text", Some(LogFormat::Compact))]
    #[test_case("xml", None)]
    fn test_parse_format(name: &str, expected: Option<LogFormat>) {
        assert_eq!(LogFormat::parse(name), expected);
    }

    #[test]
    fn test_filter_precedence() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            filter: Some("warn".to_string()),
            file: None,
        };

        let cfg = LoggingConfig::resolve(&settings, Some("trace".to_string()), false);
        assert_eq!(cfg.filter, "trace");
        assert_eq!(cfg.format, LogFormat::Json);

        let cfg = LoggingConfig::resolve(&settings, None, true);
        assert_eq!(cfg.filter, "warn");

        let cfg = LoggingConfig::resolve(&LoggingSettings::default(), None, true);
        assert_eq!(cfg.filter, "info,gugo_engage=debug");
        assert_eq!(cfg.format, LogFormat::Compact);
    }
}
