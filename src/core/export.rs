// IntuneLens - core/export.rs
//
// CSV, JSON, plain-text report and single-entry export of log records.
// Core layer: writes to any Write trait object; choosing and creating the
// destination file is the caller's job (see platform::fs::write_atomic).

use crate::core::model::{ErrorPattern, LogRecord, Snapshot};
use crate::util::constants::{CSV_HEADER, REPORT_TITLE};
use crate::util::error::ExportError;
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// ISO-8601 rendering used in CSV rows. The log has no zone, so none is
/// appended.
const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Timestamp rendering used in the text report.
const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const SECTION_SUMMARY: &str = "========== SUMMARY ==========";
const SECTION_PATTERNS: &str = "========== TOP ERROR PATTERNS ==========";
const SECTION_ERRORS: &str = "========== DETAILED ERROR LOG ==========";

/// Export records to CSV.
///
/// Writes the header `Timestamp,Level,Component,Message`, then one row per
/// record in input order with every field double-quoted and embedded quotes
/// doubled. Filtering (e.g. errors only) is up to the caller.
pub fn export_csv<W: Write>(
    records: &[LogRecord],
    mut writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let io_err = |source| ExportError::Io {
        path: export_path.to_path_buf(),
        source,
    };
    let csv_err = |source| ExportError::Csv {
        path: export_path.to_path_buf(),
        source,
    };

    // Header is written bare; only data rows are force-quoted.
    writer
        .write_all(CSV_HEADER.join(",").as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .map_err(io_err)?;

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    let mut count = 0;
    for record in records {
        let ts = record.timestamp.format(CSV_TIMESTAMP_FORMAT).to_string();
        csv_writer
            .write_record([
                ts.as_str(),
                record.severity.export_label(),
                record.source.as_str(),
                record.message.as_str(),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(io_err)?;

    tracing::debug!(path = %export_path.display(), rows = count, "CSV export written");
    Ok(count)
}

/// Render records as CSV text (same format as `export_csv`).
pub fn to_csv(records: &[LogRecord]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    export_csv(records, &mut buf, Path::new("<memory>"))?;
    // csv only ever writes the UTF-8 it was given.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Export records to JSON format (array of objects).
pub fn export_json<W: Write>(
    records: &[LogRecord],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, records).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(records.len())
}

/// Write a single record's original line (the detail-pane "Export").
pub fn export_raw_line<W: Write>(
    record: &LogRecord,
    mut writer: W,
    export_path: &Path,
) -> Result<(), ExportError> {
    writer
        .write_all(record.raw_line.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| ExportError::Io {
            path: export_path.to_path_buf(),
            source: e,
        })
}

/// Render the plain-text analysis report.
///
/// Layout: title with generation time and analysed file, a summary block
/// (totals and integer percentages), the top error patterns, then every
/// error record in file order. The output is a pure function of its
/// arguments, so it is stable for golden-file comparison.
pub fn to_report(
    snapshot: &Snapshot,
    patterns: &[ErrorPattern],
    log_path: &Path,
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{REPORT_TITLE}");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "File: {}", log_path.display());
    out.push('\n');

    let _ = writeln!(out, "{SECTION_SUMMARY}");
    let _ = writeln!(out, "Total Entries: {}", snapshot.total());
    let _ = writeln!(
        out,
        "Errors: {} ({}%)",
        snapshot.error_count(),
        snapshot.error_percentage()
    );
    let _ = writeln!(
        out,
        "Warnings: {} ({}%)",
        snapshot.warning_count(),
        snapshot.warning_percentage()
    );
    let _ = writeln!(out, "Info: {}", snapshot.info_count());
    out.push('\n');

    let _ = writeln!(out, "{SECTION_PATTERNS}");
    if patterns.is_empty() {
        out.push_str("(none)\n");
    }
    for pattern in patterns {
        let _ = writeln!(
            out,
            "- {}: {} occurrences",
            pattern.signature, pattern.count
        );
    }
    out.push('\n');

    let _ = writeln!(out, "{SECTION_ERRORS}");
    for record in snapshot.errors() {
        let _ = writeln!(
            out,
            "{}\t[{}]\t{}\t{}",
            record.timestamp.format(REPORT_TIMESTAMP_FORMAT),
            record.severity.export_label(),
            record.source,
            record.message
        );
    }

    out
}

/// Write the report produced by `to_report` to `writer`.
pub fn export_report<W: Write>(
    report: &str,
    mut writer: W,
    export_path: &Path,
) -> Result<(), ExportError> {
    writer
        .write_all(report.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| ExportError::Io {
            path: export_path.to_path_buf(),
            source: e,
        })
}
