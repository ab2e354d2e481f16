// IntuneLens - core/patterns.rs
//
// Error pattern mining over a snapshot.
// Core layer: pure logic, no I/O or UI dependencies.

use crate::core::model::{ErrorPattern, Snapshot, SourceCount};
use crate::util::constants::{MAX_ERROR_PATTERNS, MAX_ERROR_SOURCES, SIGNATURE_PREFIX_CHARS};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn hex_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"0x[0-9A-Fa-f]{8}").expect("valid hex code regex"))
}

fn error_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Error:\s*[^,]+").expect("valid error text regex"))
}

/// Extract the signature that groups an error message with similar ones.
///
/// In priority order: the first `0x` + 8 hex digit code, else the first
/// `Error: ...` run up to a comma, else the first 50 characters. The prefix
/// is counted in `char`s (Unicode scalar values), so a base letter plus a
/// combining mark counts as two.
pub fn signature(message: &str) -> String {
    if let Some(m) = hex_code_regex().find(message) {
        return m.as_str().to_string();
    }
    if let Some(m) = error_text_regex().find(message) {
        return m.as_str().to_string();
    }
    message.chars().take(SIGNATURE_PREFIX_CHARS).collect()
}

/// Top recurring error signatures, most frequent first, at most five.
///
/// Only Error records are considered. Signatures with equal counts keep the
/// order in which they were first seen.
pub fn detect_patterns(snapshot: &Snapshot) -> Vec<ErrorPattern> {
    let counts = count_in_order(snapshot.errors().map(|r| signature(&r.message)));
    top_n(counts, MAX_ERROR_PATTERNS)
        .into_iter()
        .map(|(signature, count)| ErrorPattern { signature, count })
        .collect()
}

/// Error counts per source (`process - component`), most frequent first,
/// at most ten.
pub fn errors_by_source(snapshot: &Snapshot) -> Vec<SourceCount> {
    let counts = count_in_order(snapshot.errors().map(|r| r.source.clone()));
    top_n(counts, MAX_ERROR_SOURCES)
        .into_iter()
        .map(|(source, count)| SourceCount { source, count })
        .collect()
}

/// Count keys, preserving first-seen order.
fn count_in_order(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts
}

fn top_n(mut counts: Vec<(String, usize)>, n: usize) -> Vec<(String, usize)> {
    // sort_by is stable: ties stay in first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}
