// IntuneLens - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Log Record (output of parsing)
// =============================================================================

/// A single parsed log line.
///
/// Only ever produced by `core::parser::parse_line` from a line that matched
/// the log grammar, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Wall-clock time from the leading field, millisecond precision.
    /// The log format carries no zone information.
    pub timestamp: NaiveDateTime,

    /// Severity from the single-letter level code.
    pub severity: Severity,

    /// `"<process> - <component>"`.
    pub source: String,

    /// Everything after the component field, re-joined with `" | "`.
    pub message: String,

    /// The original, unmodified line.
    pub raw_line: String,
}

// =============================================================================
// Severity
// =============================================================================

/// Severity levels, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
pub enum Severity {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl Severity {
    /// Returns all variants in display order (most severe first).
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Error,
            Severity::Warning,
            Severity::Info,
            Severity::Debug,
        ]
    }

    /// Map the log's single-letter level code. Matching is case-sensitive and
    /// anything unrecognised is Info.
    pub fn from_code(code: &str) -> Self {
        match code {
            "E" => Severity::Error,
            "W" => Severity::Warning,
            "I" => Severity::Info,
            "D" => Severity::Debug,
            _ => Severity::Info,
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
            Severity::Debug => "Debug",
        }
    }

    /// Upper-case name used in CSV and report exports.
    pub fn export_label(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable, fully-materialised view of one ingestion pass: the parsed
/// records in file order plus counters derived from them.
///
/// Counters are computed once in `Snapshot::new`, so `total()` always equals
/// `records().len()` and `error_count() + warning_count() <= total()`.
/// Consumers share snapshots as `Arc<Snapshot>` and never see a partially
/// replaced record set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<LogRecord>,
    error_count: usize,
    warning_count: usize,
}

impl Snapshot {
    pub fn new(records: Vec<LogRecord>) -> Self {
        let mut error_count = 0;
        let mut warning_count = 0;
        for record in &records {
            match record.severity {
                Severity::Error => error_count += 1,
                Severity::Warning => warning_count += 1,
                Severity::Info | Severity::Debug => {}
            }
        }
        Self {
            records,
            error_count,
            warning_count,
        }
    }

    /// A snapshot with no records (state before the first load).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Records that are neither errors nor warnings (Info and Debug).
    pub fn info_count(&self) -> usize {
        self.total() - self.error_count - self.warning_count
    }

    /// Integer percentage of error records; 0 for an empty snapshot.
    pub fn error_percentage(&self) -> usize {
        percentage(self.error_count, self.total())
    }

    /// Integer percentage of warning records; 0 for an empty snapshot.
    pub fn warning_percentage(&self) -> usize {
        percentage(self.warning_count, self.total())
    }

    /// Error records in file order.
    pub fn errors(&self) -> impl Iterator<Item = &LogRecord> {
        self.records
            .iter()
            .filter(|r| r.severity == Severity::Error)
    }
}

/// `part * 100 / total` with integer (truncating) division. A zero total
/// yields 0.
pub fn percentage(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}

// =============================================================================
// Analysis results
// =============================================================================

/// A recurring error signature and how many error records produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPattern {
    pub signature: String,
    pub count: usize,
}

/// Number of error records attributed to one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

// =============================================================================
// Watch backend selection
// =============================================================================

/// Which change-notification mechanism backs live monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchBackendKind {
    /// Kernel file-change queues via the `notify` crate.
    #[default]
    Notify,

    /// Background thread comparing size and mtime on an interval.
    Poll,
}

impl WatchBackendKind {
    /// Parse the `[watch] backend` config value (case-insensitive).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "notify" => Some(Self::Notify),
            "poll" => Some(Self::Poll),
            _ => None,
        }
    }
}

// =============================================================================
// Monitor events (for UI updates)
// =============================================================================

/// Messages sent from the watch notification thread to the UI thread.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Monitoring became active for a path.
    WatchStarted { path: PathBuf },

    /// A file change was picked up and the file re-ingested.
    Reloaded {
        snapshot: Arc<Snapshot>,
        /// True when the error count grew relative to a nonzero previous
        /// count. The UI decides whether and how to alert.
        new_errors: bool,
        /// How many errors were added when `new_errors` is set, else 0.
        new_error_delta: usize,
    },

    /// A change-triggered reload could not read the file. The previously
    /// published snapshot remains current.
    ReloadFailed { path: PathBuf, message: String },

    /// Monitoring was switched off.
    WatchStopped,
}
