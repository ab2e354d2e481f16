// IntuneLens - app/state.rs
//
// View state for the presentation collaborator. Holds the current snapshot,
// filter, selection and status line, and folds monitor events into them.

use crate::core::filter::FilterState;
use crate::core::model::{LogRecord, MonitorEvent, Snapshot};
use crate::core::store::LoadResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level view state.
#[derive(Debug)]
pub struct AppState {
    /// Snapshot currently on display. Replaced whole on every load.
    pub snapshot: Arc<Snapshot>,

    /// File the snapshot was built from (None before the first load).
    pub log_path: Option<PathBuf>,

    /// Current filter configuration.
    pub filter_state: FilterState,

    /// Indices of records matching the current filter (into the snapshot).
    pub filtered_indices: Vec<usize>,

    /// Index of the currently selected record in `filtered_indices`.
    pub selected_index: Option<usize>,

    /// Status message for the status bar.
    pub status_message: String,

    /// Whether live monitoring is active.
    pub is_monitoring: bool,

    /// Set by a reload that added errors; cleared by `acknowledge_new_errors`.
    pub new_error_delta: Option<usize>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::empty()),
            log_path: None,
            filter_state: FilterState::default(),
            filtered_indices: Vec::new(),
            selected_index: None,
            status_message: "Ready. Open an Intune log file to begin.".to_string(),
            is_monitoring: false,
            new_error_delta: None,
        }
    }

    /// Install the result of a caller-initiated load.
    pub fn apply_load(&mut self, path: &Path, result: &LoadResult) {
        self.log_path = Some(path.to_path_buf());
        self.install_snapshot(Arc::clone(&result.snapshot));
        self.new_error_delta = None;
        self.status_message = summary_line(&self.snapshot, result.skipped_lines);
    }

    /// Fold one monitor event into the view.
    pub fn apply_event(&mut self, event: &MonitorEvent) {
        match event {
            MonitorEvent::WatchStarted { path } => {
                self.is_monitoring = true;
                self.status_message = format!("Monitoring {}", path.display());
            }
            MonitorEvent::Reloaded {
                snapshot,
                new_errors,
                new_error_delta,
            } => {
                self.install_snapshot(Arc::clone(snapshot));
                if *new_errors {
                    let pending = self.new_error_delta.unwrap_or(0);
                    self.new_error_delta = Some(pending + new_error_delta);
                    self.status_message = format!("{new_error_delta} new errors detected");
                } else {
                    self.status_message = summary_line(&self.snapshot, 0);
                }
            }
            MonitorEvent::ReloadFailed { path, message } => {
                self.status_message =
                    format!("Reload of {} failed: {message}", path.display());
            }
            MonitorEvent::WatchStopped => {
                self.is_monitoring = false;
                self.status_message = "Monitoring stopped".to_string();
            }
        }
    }

    /// Dismiss the new-errors alert.
    pub fn acknowledge_new_errors(&mut self) {
        self.new_error_delta = None;
    }

    /// Recompute filtered indices from the current snapshot and filter state.
    pub fn apply_filters(&mut self) {
        self.filtered_indices =
            crate::core::filter::apply_filters(self.snapshot.records(), &self.filter_state);

        if let Some(idx) = self.selected_index {
            if idx >= self.filtered_indices.len() {
                self.selected_index = None;
            }
        }
    }

    /// Get the currently selected record, if any.
    pub fn selected_record(&self) -> Option<&LogRecord> {
        self.selected_index
            .and_then(|idx| self.filtered_indices.get(idx))
            .and_then(|&record_idx| self.snapshot.records().get(record_idx))
    }

    /// The records in the current filtered view, in file order. This is what
    /// the export actions write.
    pub fn filtered_records(&self) -> Vec<LogRecord> {
        let records = self.snapshot.records();
        self.filtered_indices
            .iter()
            .filter_map(|&idx| records.get(idx).cloned())
            .collect()
    }

    /// Drop the loaded file and reset to initial state.
    pub fn clear(&mut self) {
        *self = Self {
            status_message: "Ready.".to_string(),
            ..Self::new()
        };
    }

    fn install_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = snapshot;
        self.apply_filters();
    }
}

fn summary_line(snapshot: &Snapshot, skipped: usize) -> String {
    let mut line = format!(
        "{} entries: {} errors, {} warnings",
        snapshot.total(),
        snapshot.error_count(),
        snapshot.warning_count()
    );
    if skipped > 0 {
        line.push_str(&format!(" ({skipped} unparsed lines skipped)"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::RecordStore;

    const CONTENT: &str = "\
2025-07-22 16:16:26:133 | IntuneMDM-Daemon | I | 1 | VppAppManager | Starting sync
2025-07-22 16:16:27:000 | IntuneMDM-Daemon | E | 1 | AppInstaller | Failed 0x87D1041C
2025-07-22 16:16:28:000 | IntuneMDM-Agent | W | 2 | Network | Retrying request
garbage line
";

    fn loaded() -> AppState {
        let mut store = RecordStore::new();
        let result = store.load(CONTENT);
        let mut state = AppState::new();
        state.apply_load(Path::new("/tmp/IntuneMDMDaemon.log"), &result);
        state
    }

    #[test]
    fn test_apply_load_shows_all_records() {
        let state = loaded();
        assert_eq!(state.filtered_indices, vec![0, 1, 2]);
        assert_eq!(state.status_message, "3 entries: 1 errors, 1 warnings (1 unparsed lines skipped)");
    }

    #[test]
    fn test_errors_only_view_feeds_export() {
        let mut state = loaded();
        state.filter_state = FilterState::errors_only();
        state.apply_filters();
        let records = state.filtered_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Failed 0x87D1041C");
    }

    #[test]
    fn test_selection_cleared_when_out_of_range() {
        let mut state = loaded();
        state.selected_index = Some(2);
        assert_eq!(state.selected_record().map(|r| r.source.as_str()), Some("IntuneMDM-Agent - Network"));

        state.filter_state.text_search = "appinstaller".to_string();
        state.apply_filters();
        assert_eq!(state.selected_index, None);
        assert_eq!(state.filtered_indices, vec![1]);
    }

    #[test]
    fn test_reload_event_with_new_errors_sets_alert() {
        let mut state = loaded();
        let mut store = RecordStore::new();
        store.load(CONTENT);
        let grown = format!(
            "{CONTENT}2025-07-22 16:16:29:000 | IntuneMDM-Daemon | E | 1 | AppInstaller | Failed again\n"
        );
        let result = store.load(&grown);

        state.apply_event(&MonitorEvent::Reloaded {
            snapshot: result.snapshot,
            new_errors: result.new_errors,
            new_error_delta: result.new_error_delta,
        });
        assert_eq!(state.new_error_delta, Some(1));
        assert_eq!(state.status_message, "1 new errors detected");
        assert_eq!(state.filtered_indices.len(), 4);

        state.acknowledge_new_errors();
        assert_eq!(state.new_error_delta, None);
    }

    #[test]
    fn test_watch_events_toggle_monitoring() {
        let mut state = AppState::new();
        state.apply_event(&MonitorEvent::WatchStarted {
            path: PathBuf::from("/tmp/a.log"),
        });
        assert!(state.is_monitoring);
        state.apply_event(&MonitorEvent::WatchStopped);
        assert!(!state.is_monitoring);
    }

    #[test]
    fn test_reload_failure_keeps_snapshot() {
        let mut state = loaded();
        let before = Arc::clone(&state.snapshot);
        state.apply_event(&MonitorEvent::ReloadFailed {
            path: PathBuf::from("/tmp/IntuneMDMDaemon.log"),
            message: "gone".to_string(),
        });
        assert!(Arc::ptr_eq(&before, &state.snapshot));
        assert!(state.status_message.contains("gone"));
    }

    #[test]
    fn test_clear_resets() {
        let mut state = loaded();
        state.clear();
        assert!(state.snapshot.is_empty());
        assert!(state.log_path.is_none());
        assert!(state.filtered_indices.is_empty());
    }
}
