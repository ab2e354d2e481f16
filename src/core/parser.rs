// IntuneLens - core/parser.rs
//
// Line parser for the Intune MDM daemon log format:
//
//   2025-07-22 16:16:26:133 | IntuneMDM-Daemon | I | 73077213 | ScriptOrchestrationLogger | Message
//
// Core layer: pure functions over `&str`, never touches the filesystem.
// Lines that do not match the grammar yield `None` and are dropped by the
// caller; there is no per-line error value.

use crate::core::model::{LogRecord, Severity};
use crate::util::constants::{
    FIELD_DELIMITER, MESSAGE_JOIN_SEPARATOR, MIN_FIELDS, TIMESTAMP_FORMAT,
};
use chrono::NaiveDateTime;

// Field positions after splitting on the delimiter. Field 3 (a numeric
// thread/activity id) is not part of the record.
const FIELD_TIMESTAMP: usize = 0;
const FIELD_PROCESS: usize = 1;
const FIELD_LEVEL: usize = 2;
const FIELD_COMPONENT: usize = 4;
const FIELD_MESSAGE: usize = 5;

/// Parse one raw log line into a record.
///
/// Returns `None` when the line has fewer than six delimited fields or its
/// first field is not a `YYYY-MM-DD HH:mm:ss:SSS` timestamp.
///
/// Zero-length pieces (`||`, a leading or trailing `|`) are not fields and
/// are dropped before trimming; whitespace-only pieces still count.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let fields: Vec<&str> = line
        .split(FIELD_DELIMITER)
        .filter(|f| !f.is_empty())
        .map(str::trim)
        .collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let timestamp = parse_timestamp(fields[FIELD_TIMESTAMP])?;

    Some(LogRecord {
        timestamp,
        severity: Severity::from_code(fields[FIELD_LEVEL]),
        source: format!("{} - {}", fields[FIELD_PROCESS], fields[FIELD_COMPONENT]),
        message: fields[FIELD_MESSAGE..].join(MESSAGE_JOIN_SEPARATOR),
        raw_line: line.to_string(),
    })
}

/// Parse the leading timestamp field. Seconds and milliseconds are separated
/// by a colon; exactly three millisecond digits are required.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}
