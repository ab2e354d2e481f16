// IntuneLens - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "IntuneLens";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "IntuneLens";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Line grammar
// =============================================================================

/// Field separator of the Intune MDM daemon log format.
pub const FIELD_DELIMITER: char = '|';

/// Separator used when re-joining message fields that themselves contained
/// the field delimiter.
pub const MESSAGE_JOIN_SEPARATOR: &str = " | ";

/// Minimum number of delimited fields a line needs to be a log record:
/// `timestamp | process | level | id | component | message`.
pub const MIN_FIELDS: usize = 6;

/// chrono format for the leading timestamp field, e.g. `2025-07-22 16:16:26:133`.
/// Note the colon (not a period) before the milliseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%3f";

// =============================================================================
// Analysis
// =============================================================================

/// Maximum number of error signatures returned by pattern detection.
pub const MAX_ERROR_PATTERNS: usize = 5;

/// Number of leading characters used as the fallback error signature.
pub const SIGNATURE_PREFIX_CHARS: usize = 50;

/// Maximum number of sources listed in the per-source error summary.
pub const MAX_ERROR_SOURCES: usize = 10;

// =============================================================================
// Live monitoring
// =============================================================================

/// Default interval between polls when the polling watch backend is used (ms).
pub const DEFAULT_WATCH_POLL_INTERVAL_MS: u64 = 500;

/// Minimum user-configurable poll interval (ms).
pub const MIN_WATCH_POLL_INTERVAL_MS: u64 = 100;

/// Maximum user-configurable poll interval (ms).
pub const MAX_WATCH_POLL_INTERVAL_MS: u64 = 10_000; // 10 s

/// How often the poll thread checks its cancel flag while sleeping (ms).
pub const WATCH_CANCEL_CHECK_INTERVAL_MS: u64 = 50;

/// Maximum number of monitor events drained per `poll_events` call when the
/// caller does not supply its own budget.
pub const MAX_MONITOR_EVENTS_PER_POLL: usize = 64;

// =============================================================================
// Log discovery
// =============================================================================

/// Directory where the Intune MDM agent writes its logs on macOS.
pub const DEFAULT_LOG_DIRECTORY: &str = "/Library/Logs/Microsoft/Intune";

/// Glob pattern (file name only) identifying log files in the log directory.
pub const LOG_FILE_PATTERN: &str = "*.log";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Export
// =============================================================================

/// CSV header row.
pub const CSV_HEADER: [&str; 4] = ["Timestamp", "Level", "Component", "Message"];

/// Title line of the plain-text analysis report.
pub const REPORT_TITLE: &str = "INTUNE LOG ANALYSIS REPORT";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
