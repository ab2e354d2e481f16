// IntuneLens - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation. All errors preserve the causal chain
// for diagnostic logging.
//
// A line that does not match the log grammar is deliberately NOT an error
// value: the parser returns `None` and the line is dropped.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all IntuneLens operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum IntuneLensError {
    /// Reading a log file failed; the previous snapshot is untouched.
    Load(LoadError),

    /// A file watch could not be established.
    Watch(WatchError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for IntuneLensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "Load error: {e}"),
            Self::Watch(e) => write!(f, "Watch error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for IntuneLensError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(e) => Some(e),
            Self::Watch(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

/// Errors raised while reading a log file (or locating one).
#[derive(Debug)]
pub enum LoadError {
    /// The file (or directory) could not be opened or read.
    Read { path: PathBuf, source: io::Error },

    /// The file is not valid UTF-8.
    InvalidEncoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    /// The path exists but is not a regular file.
    NotAFile { path: PathBuf },

    /// The log directory contains no file matching the log pattern.
    NoLogFiles { dir: PathBuf },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "Cannot read '{}': {source}", path.display())
            }
            Self::InvalidEncoding { path, source } => {
                write!(f, "'{}': invalid UTF-8 encoding: {source}", path.display())
            }
            Self::NotAFile { path } => {
                write!(f, "'{}' is not a regular file", path.display())
            }
            Self::NoLogFiles { dir } => {
                write!(f, "No log files found in '{}'", dir.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::InvalidEncoding { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<LoadError> for IntuneLensError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

// ---------------------------------------------------------------------------
// Watch errors
// ---------------------------------------------------------------------------

/// Errors raised while establishing a file watch. Always non-fatal: the
/// caller keeps the loaded snapshot and simply runs without monitoring.
#[derive(Debug)]
pub enum WatchError {
    /// The kernel notification backend refused the watch.
    Backend {
        path: PathBuf,
        source: notify::Error,
    },

    /// The watched path could not be inspected.
    Io { path: PathBuf, source: io::Error },

    /// The background poll thread could not be started.
    Spawn { path: PathBuf, source: io::Error },
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { path, source } => {
                write!(f, "Cannot watch '{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Cannot inspect '{}' for watching: {source}", path.display())
            }
            Self::Spawn { path, source } => write!(
                f,
                "Cannot start poll thread for '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<WatchError> for IntuneLensError {
    fn from(e: WatchError) -> Self {
        Self::Watch(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for IntuneLensError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for IntuneLensError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for IntuneLens results.
pub type Result<T> = std::result::Result<T, IntuneLensError>;
