// IntuneLens - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::WatchBackendKind;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for IntuneLens configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/intunelens/ or
    /// ~/Library/Application Support/IntuneLens/).
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[watch]` section.
    pub watch: WatchSection,
    /// `[discovery]` section.
    pub discovery: DiscoverySection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[watch]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Re-load automatically when the file changes.
    pub auto_refresh: Option<bool>,
    /// "notify" or "poll".
    pub backend: Option<String>,
    /// Poll interval for the poll backend (ms).
    pub poll_interval_ms: Option<u64>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Directory searched by "load latest log".
    pub log_directory: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Watch --
    /// Arm the file watcher after each successful open.
    pub auto_refresh: bool,
    /// Change-notification backend.
    pub watch_backend: WatchBackendKind,
    /// Poll interval used by the poll backend (ms).
    pub poll_interval_ms: u64,

    // -- Discovery --
    /// Directory searched by "load latest log".
    pub log_directory: PathBuf,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            watch_backend: WatchBackendKind::default(),
            poll_interval_ms: constants::DEFAULT_WATCH_POLL_INTERVAL_MS,
            log_directory: PathBuf::from(constants::DEFAULT_LOG_DIRECTORY),
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unreadable or unparseable, returns defaults with a warning.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let raw = match read_raw_config(&config_path) {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");

    let (config, field_errors) = validate(raw);
    for e in field_errors {
        warnings.push(e.to_string());
    }

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

fn read_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Validate each field, accumulating all errors. Every rejected value keeps
/// its default.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<ConfigError>) {
    let mut config = AppConfig::default();
    let mut errors = Vec::new();

    if let Some(enabled) = raw.watch.auto_refresh {
        config.auto_refresh = enabled;
    }

    if let Some(ref backend) = raw.watch.backend {
        match WatchBackendKind::from_config_str(backend) {
            Some(kind) => config.watch_backend = kind,
            None => errors.push(ConfigError::ValueOutOfRange {
                field: "[watch] backend".to_string(),
                value: backend.clone(),
                expected: "\"notify\" or \"poll\"".to_string(),
            }),
        }
    }

    if let Some(ms) = raw.watch.poll_interval_ms {
        if (constants::MIN_WATCH_POLL_INTERVAL_MS..=constants::MAX_WATCH_POLL_INTERVAL_MS)
            .contains(&ms)
        {
            config.poll_interval_ms = ms;
        } else {
            errors.push(ConfigError::ValueOutOfRange {
                field: "[watch] poll_interval_ms".to_string(),
                value: ms.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_WATCH_POLL_INTERVAL_MS,
                    constants::MAX_WATCH_POLL_INTERVAL_MS
                ),
            });
        }
    }

    if let Some(ref dir) = raw.discovery.log_directory {
        if dir.trim().is_empty() {
            errors.push(ConfigError::ValueOutOfRange {
                field: "[discovery] log_directory".to_string(),
                value: dir.clone(),
                expected: "a non-empty directory path".to_string(),
            });
        } else {
            config.log_directory = PathBuf::from(dir);
        }
    }

    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            errors.push(ConfigError::ValueOutOfRange {
                field: "[logging] level".to_string(),
                value: level.clone(),
                expected: "error, warn, info, debug, trace".to_string(),
            });
        }
    }

    (config, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) {
        std::fs::write(dir.join(constants::CONFIG_FILE_NAME), body).unwrap();
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty());
        assert!(config.auto_refresh);
        assert_eq!(config.watch_backend, WatchBackendKind::Notify);
        assert_eq!(config.poll_interval_ms, constants::DEFAULT_WATCH_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_valid_config_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[watch]
auto_refresh = false
backend = "Poll"
poll_interval_ms = 250

[discovery]
log_directory = "/var/log/intune"

[logging]
level = "debug"
"#,
        );
        let (config, warnings) = load_config(dir.path());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(!config.auto_refresh);
        assert_eq!(config.watch_backend, WatchBackendKind::Poll);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.log_directory, PathBuf::from("/var/log/intune"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_fall_back_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[watch]
backend = "kqueue"
poll_interval_ms = 5

[logging]
level = "loud"
"#,
        );
        let (config, warnings) = load_config(dir.path());
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert_eq!(config.watch_backend, WatchBackendKind::Notify);
        assert_eq!(config.poll_interval_ms, constants::DEFAULT_WATCH_POLL_INTERVAL_MS);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_unparseable_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[watch\nbackend = ");
        let (config, warnings) = load_config(dir.path());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Config parse error"));
        assert!(config.auto_refresh);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[future]\nfeature = true\n");
        let (_, warnings) = load_config(dir.path());
        assert!(warnings.is_empty());
    }
}
