// IntuneLens - core/filter.rs
//
// Filter engine for the record list. All active filters are AND-combined.
// Core layer: pure logic, no I/O or UI dependencies.

use crate::core::model::{LogRecord, Severity};
use std::collections::HashSet;

/// Complete filter state. All fields are AND-combined when applied.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    /// Severity levels to include (empty = all).
    pub severity_levels: HashSet<Severity>,

    /// Substring search over message and source (case-insensitive).
    /// Empty = no filter.
    pub text_search: String,
}

impl FilterState {
    /// Returns true if no filters are active.
    pub fn is_empty(&self) -> bool {
        self.severity_levels.is_empty() && self.text_search.is_empty()
    }

    /// Quick-filter for errors only (the "Export Errors Only" view).
    pub fn errors_only() -> Self {
        Self {
            severity_levels: HashSet::from([Severity::Error]),
            ..Default::default()
        }
    }

    /// Quick-filter for errors and warnings.
    pub fn errors_and_warnings() -> Self {
        Self {
            severity_levels: HashSet::from([Severity::Error, Severity::Warning]),
            ..Default::default()
        }
    }
}

/// Apply filters to a slice of records, returning indices of matching records.
///
/// Indices refer to the original slice and stay in file order.
pub fn apply_filters(records: &[LogRecord], filter: &FilterState) -> Vec<usize> {
    if filter.is_empty() {
        return (0..records.len()).collect();
    }

    let text_lower = filter.text_search.to_lowercase();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches_all(record, filter, &text_lower))
        .map(|(idx, _)| idx)
        .collect()
}

fn matches_all(record: &LogRecord, filter: &FilterState, text_lower: &str) -> bool {
    if !filter.severity_levels.is_empty() && !filter.severity_levels.contains(&record.severity) {
        return false;
    }

    if !text_lower.is_empty()
        && !record.message.to_lowercase().contains(text_lower)
        && !record.source.to_lowercase().contains(text_lower)
    {
        return false;
    }

    true
}
