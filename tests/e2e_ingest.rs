// IntuneLens - tests/e2e_ingest.rs
//
// End-to-end tests for the ingest, analysis, export and monitoring pipeline.
//
// These tests exercise the real filesystem, real chrono timestamp parsing,
// real csv/serde_json writers and a real watcher thread. No mocks: every
// test goes from a log file on disk to the records, counts and exports a
// user would see.

use intunelens::app::ingest::Ingestor;
use intunelens::app::monitor::LogMonitor;
use intunelens::app::state::AppState;
use intunelens::app::watcher::PollBackend;
use intunelens::core::filter::FilterState;
use intunelens::core::model::{MonitorEvent, Severity};
use intunelens::core::{export, patterns};
use intunelens::platform::fs;
use intunelens::util::error::ExportError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to an on-disk fixture file.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

const SAMPLE: &str = "IntuneMDMDaemon_sample.log";

fn line(severity: &str, message: &str) -> String {
    format!("2025-07-22 16:16:26:133 | IntuneMDM-Daemon | {severity} | 1 | AppInstaller | {message}\n")
}

fn errors(n: usize) -> String {
    (0..n).map(|i| line("E", &format!("Failure {i}"))).collect()
}

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

// =============================================================================
// Ingest E2E
// =============================================================================

#[test]
fn e2e_fixture_counts_and_fields() {
    let ingestor = Ingestor::new();
    let result = ingestor.load(&fixture(SAMPLE)).unwrap();
    let snapshot = result.snapshot;

    assert_eq!(snapshot.total(), 10);
    assert_eq!(result.skipped_lines, 2);
    assert_eq!(snapshot.error_count(), 4);
    assert_eq!(snapshot.warning_count(), 2);
    assert_eq!(snapshot.info_count(), 4);
    assert_eq!(snapshot.error_percentage(), 40);
    assert_eq!(snapshot.warning_percentage(), 20);
    assert!(!result.new_errors, "first load never raises the alert");

    let records = snapshot.records();
    assert_eq!(records[0].source, "IntuneMDM-Daemon - VppAppManager");
    assert_eq!(records[5].severity, Severity::Debug);
    // A pipe inside the message survives as " | ".
    assert_eq!(records[7].message, "Request complete | status=200");
}

#[test]
fn e2e_malformed_lines_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.log");
    let mut content = String::new();
    for i in 0..100 {
        if i % 10 == 0 {
            content.push_str("this line has no structure at all\n");
        } else {
            content.push_str(&line("I", &format!("entry {i}")));
        }
    }
    write(&path, &content);

    let result = Ingestor::new().load(&path).unwrap();
    assert_eq!(result.snapshot.total(), 90);
    assert_eq!(result.skipped_lines, 10);
}

#[test]
fn e2e_empty_file_loads_as_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.log");
    write(&path, "");

    let result = Ingestor::new().load(&path).unwrap();
    assert_eq!(result.snapshot.total(), 0);
    assert_eq!(result.snapshot.error_percentage(), 0);
    assert!(patterns::detect_patterns(&result.snapshot).is_empty());
}

#[test]
fn e2e_loading_is_deterministic() {
    let a = Ingestor::new().load(&fixture(SAMPLE)).unwrap();
    let b = Ingestor::new().load(&fixture(SAMPLE)).unwrap();
    assert_eq!(a.snapshot.records(), b.snapshot.records());
}

#[test]
fn e2e_new_error_signal_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IntuneMDMDaemon.log");
    let ingestor = Ingestor::new();

    write(&path, &errors(5));
    let first = ingestor.load(&path).unwrap();
    assert!(!first.new_errors);

    let same = ingestor.load(&path).unwrap();
    assert!(!same.new_errors);

    write(&path, &errors(7));
    let grown = ingestor.load(&path).unwrap();
    assert!(grown.new_errors);
    assert_eq!(grown.new_error_delta, 2);

    write(&path, &errors(3));
    let shrunk = ingestor.load(&path).unwrap();
    assert!(!shrunk.new_errors);
    assert_eq!(shrunk.new_error_delta, 0);
}

#[test]
fn e2e_missing_file_keeps_previous_snapshot() {
    let ingestor = Ingestor::new();
    ingestor.load(&fixture(SAMPLE)).unwrap();
    let before = ingestor.current();

    assert!(ingestor.load(&fixture("does_not_exist.log")).is_err());
    assert!(Arc::ptr_eq(&before, &ingestor.current()));
}

// =============================================================================
// Analysis E2E
// =============================================================================

#[test]
fn e2e_patterns_and_sources_from_fixture() {
    let snapshot = Ingestor::new().load(&fixture(SAMPLE)).unwrap().snapshot;

    let top = patterns::detect_patterns(&snapshot);
    let top: Vec<(&str, usize)> = top.iter().map(|p| (p.signature.as_str(), p.count)).collect();
    assert_eq!(top, vec![("0x87D1041C", 3), ("0x80070005", 1)]);

    let sources = patterns::errors_by_source(&snapshot);
    assert_eq!(sources[0].source, "IntuneMDM-Daemon - AppInstaller");
    assert_eq!(sources[0].count, 3);
    assert_eq!(sources[1].source, "IntuneMDM-Agent - ComplianceChecker");
}

// =============================================================================
// Export E2E
// =============================================================================

#[test]
fn e2e_errors_only_csv_export() {
    let path = fixture(SAMPLE);
    let result = Ingestor::new().load(&path).unwrap();
    let mut state = AppState::new();
    state.filter_state = FilterState::errors_only();
    state.apply_load(&path, &result);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("errors.csv");
    let records = state.filtered_records();
    let rows = fs::write_atomic(&out, |w| export::export_csv(&records, w, &out)).unwrap();
    assert_eq!(rows, 4);

    let written = std::fs::read_to_string(&out).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("Timestamp,Level,Component,Message"));
    assert_eq!(
        lines.next(),
        Some(
            "\"2025-07-22T16:16:27.015\",\"ERROR\",\"IntuneMDM-Daemon - AppInstaller\",\
             \"Failed to install app. Error: 0x87D1041C, retrying\""
        )
    );
    assert_eq!(lines.count(), 3);
}

#[test]
fn e2e_json_export_is_an_array_of_records() {
    let snapshot = Ingestor::new().load(&fixture(SAMPLE)).unwrap().snapshot;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("records.json");

    let count =
        fs::write_atomic(&out, |w| export::export_json(snapshot.records(), w, &out)).unwrap();
    assert_eq!(count, 10);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 10);
    assert_eq!(array[0]["message"], "Starting VPP sync");
}

#[test]
fn e2e_report_export() {
    let path = fixture(SAMPLE);
    let snapshot = Ingestor::new().load(&path).unwrap().snapshot;
    let top = patterns::detect_patterns(&snapshot);
    let generated_at = chrono::NaiveDate::from_ymd_opt(2025, 7, 23)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap();
    let report = export::to_report(&snapshot, &top, &path, generated_at);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.txt");
    fs::write_atomic(&out, |w| export::export_report(&report, w, &out)).unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("INTUNE LOG ANALYSIS REPORT\nGenerated: 2025-07-23 09:00:00\n"));
    assert!(written.contains("Total Entries: 10\n"));
    assert!(written.contains("Errors: 4 (40%)\n"));
    assert!(written.contains("Warnings: 2 (20%)\n"));
    assert!(written.contains("- 0x87D1041C: 3 occurrences\n"));
    let detail = written
        .split("========== DETAILED ERROR LOG ==========\n")
        .nth(1)
        .unwrap();
    assert_eq!(detail.lines().count(), 4);
}

#[test]
fn e2e_failed_export_leaves_state_untouched() {
    let path = fixture(SAMPLE);
    let ingestor = Ingestor::new();
    ingestor.load(&path).unwrap();
    let before = ingestor.current();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("missing-dir").join("out.csv");
    let result = fs::write_atomic(&out, |w| export::export_csv(before.records(), w, &out));

    assert!(matches!(result, Err(ExportError::Io { .. })));
    assert!(!out.exists());
    assert!(Arc::ptr_eq(&before, &ingestor.current()));
}

// =============================================================================
// Discovery + monitoring E2E
// =============================================================================

#[test]
fn e2e_latest_log_file_opens_newest() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("IntuneMDMDaemon 2025-07-21.log");
    let new = dir.path().join("IntuneMDMDaemon 2025-07-22.log");
    write(&old, &errors(1));
    write(&new, &errors(2));
    let now = std::time::SystemTime::now();
    std::fs::File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(now - Duration::from_secs(600))
        .unwrap();

    let latest = fs::latest_log_file(dir.path()).unwrap();
    assert_eq!(latest, new);
    assert_eq!(Ingestor::new().load(&latest).unwrap().snapshot.total(), 2);
}

#[test]
fn e2e_appending_errors_raises_alert_while_monitoring() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IntuneMDMDaemon.log");
    write(&path, &errors(1));

    let backend = PollBackend::new(Duration::from_millis(50));
    let mut monitor = LogMonitor::with_backend(Box::new(backend), true);
    let mut state = AppState::new();
    let result = monitor.open(&path).unwrap();
    state.apply_load(&path, &result);
    assert!(monitor.is_monitoring());

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(errors(2).as_bytes()).unwrap();
    file.flush().unwrap();
    drop(file);

    let deadline = Instant::now() + Duration::from_secs(10);
    while state.snapshot.error_count() < 3 && Instant::now() < deadline {
        if let Some(event) = monitor.wait_event(Duration::from_millis(200)) {
            state.apply_event(&event);
        }
    }

    assert!(state.is_monitoring);
    assert_eq!(state.new_error_delta, Some(2));
    assert_eq!(state.snapshot.error_count(), 3);

    monitor.disarm();
    let stopped = monitor
        .poll_events(16)
        .into_iter()
        .any(|e| matches!(e, MonitorEvent::WatchStopped));
    assert!(stopped);
}
