// IntuneLens - core/store.rs
//
// Record store: turns the full text of a log file into an immutable
// `Snapshot` and tracks the error count across loads to raise the
// "new errors" signal.
//
// Every load replaces the snapshot wholesale; there is no append-merge.
// Core layer: takes file content as `&str`, the app layer does the reading.

use crate::core::model::Snapshot;
use crate::core::parser;
use crate::util::logging;
use std::sync::Arc;

/// Outcome of one ingestion pass.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// The freshly built snapshot (also retained by the store).
    pub snapshot: Arc<Snapshot>,

    /// True iff the previous load had a nonzero error count and this load
    /// has more errors than that.
    pub new_errors: bool,

    /// `error_count - previous_error_count` when `new_errors` is set, else 0.
    pub new_error_delta: usize,

    /// Non-empty lines the parser rejected.
    pub skipped_lines: usize,
}

/// Holds the snapshot of the currently loaded file plus the error count of
/// the previous load.
#[derive(Debug, Default)]
pub struct RecordStore {
    snapshot: Arc<Snapshot>,
    previous_error_count: usize,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `content` and replace the current snapshot.
    ///
    /// Identical content always yields an identical snapshot; only the
    /// `new_errors` signal depends on earlier calls.
    pub fn load(&mut self, content: &str) -> LoadResult {
        let (snapshot, skipped_lines) = build_snapshot(content);
        let error_count = snapshot.error_count();

        // A zero baseline (first load, or an empty previous file) never
        // fires, so opening a file that already has errors is not an alert.
        let new_errors =
            self.previous_error_count > 0 && error_count > self.previous_error_count;
        let new_error_delta = if new_errors {
            error_count - self.previous_error_count
        } else {
            0
        };

        tracing::debug!(
            total = snapshot.total(),
            errors = error_count,
            warnings = snapshot.warning_count(),
            previous_errors = self.previous_error_count,
            skipped_lines,
            new_errors,
            "Snapshot rebuilt"
        );

        self.previous_error_count = error_count;
        self.snapshot = Arc::new(snapshot);

        LoadResult {
            snapshot: Arc::clone(&self.snapshot),
            new_errors,
            new_error_delta,
            skipped_lines,
        }
    }

    /// The snapshot produced by the most recent load (empty before any load).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Forget the current snapshot and the error baseline, e.g. when a
    /// different file is opened.
    pub fn reset(&mut self) {
        self.snapshot = Arc::new(Snapshot::empty());
        self.previous_error_count = 0;
    }
}

/// Build a snapshot from raw file content without touching any store state.
///
/// Returns the snapshot and the number of non-empty lines that were rejected.
pub fn build_snapshot(content: &str) -> (Snapshot, usize) {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in content.split(is_line_break).filter(|l| !l.is_empty()) {
        match parser::parse_line(line) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                tracing::trace!(line = logging::preview(line), "Skipping malformed line");
            }
        }
    }

    (Snapshot::new(records), skipped)
}

/// Universal newline set: LF, VT, FF, CR, NEL and the Unicode line/paragraph
/// separators. CRLF splits into two breaks with an empty line between them,
/// which is then discarded.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\u{000B}' | '\u{000C}' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}
