// IntuneLens - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr. Log lines from the file being analysed are only ever
// logged truncated (DEBUG_MAX_LINE_PREVIEW) and only at debug level.

use tracing_subscriber::EnvFilter;

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(super::constants::DEFAULT_LOG_LEVEL)
    };

    // A second install (tests) is a no-op rather than a panic.
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .try_init()
        .is_ok();

    tracing::debug!(
        app = super::constants::APP_NAME,
        version = super::constants::APP_VERSION,
        installed,
        "Logging initialised"
    );
}

/// Truncate a raw log line for inclusion in debug output.
pub fn preview(line: &str) -> &str {
    let max = super::constants::DEBUG_MAX_LINE_PREVIEW;
    match line.char_indices().nth(max) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
