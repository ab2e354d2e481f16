// IntuneLens - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading, then logging initialisation (debug mode support)
// 3. Resolving the log file (explicit path or newest in the Intune log dir)
// 4. Printing the analysis and writing any requested exports
// 5. Optional live monitoring until interrupted

use clap::Parser;
use intunelens::app::monitor::LogMonitor;
use intunelens::app::state::AppState;
use intunelens::core::filter::FilterState;
use intunelens::core::{export, patterns};
use intunelens::platform::config::{self, AppConfig, PlatformPaths};
use intunelens::platform::fs;
use intunelens::util::{self, constants, error};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// IntuneLens - Intune MDM daemon log reader and analyser.
///
/// Parses an Intune log, summarises errors and warnings, finds recurring
/// error patterns, and can follow the file live as the daemon writes to it.
#[derive(Parser, Debug)]
#[command(name = "intunelens", version, about)]
struct Cli {
    /// Log file to open (defaults to the newest log in the Intune log directory).
    path: Option<PathBuf>,

    /// Open the newest `*.log` in the configured log directory.
    #[arg(short = 'l', long = "latest", conflicts_with = "path")]
    latest: bool,

    /// Keep running and report changes as the file is written.
    #[arg(short = 'w', long = "watch")]
    watch: bool,

    /// Restrict the record view and CSV/JSON exports to errors.
    #[arg(short = 'e', long = "errors-only")]
    errors_only: bool,

    /// Case-insensitive text filter over message and source.
    #[arg(short = 's', long = "search")]
    search: Option<String>,

    /// Write the (filtered) records as CSV.
    #[arg(long = "csv", value_name = "OUT")]
    csv: Option<PathBuf>,

    /// Write the (filtered) records as JSON.
    #[arg(long = "json", value_name = "OUT")]
    json: Option<PathBuf>,

    /// Write the plain-text analysis report.
    #[arg(long = "report", value_name = "OUT")]
    report: Option<PathBuf>,

    /// Directory holding config.toml (overrides the platform default).
    #[arg(long = "config-dir")]
    config_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config first so its [logging] level can seed the subscriber.
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_dir);
    let (app_config, config_warnings) = config::load_config(&config_dir);

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "IntuneLens starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    match run(&cli, &app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "IntuneLens failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, app_config: &AppConfig) -> error::Result<()> {
    let path = match &cli.path {
        Some(path) if !cli.latest => path.clone(),
        _ => fs::latest_log_file(&app_config.log_directory)?,
    };

    // One-shot analysis never arms the watcher; --watch always does.
    let mut monitor = LogMonitor::new(app_config);
    monitor.set_auto_refresh(cli.watch)?;

    let mut state = AppState::new();
    if cli.errors_only {
        state.filter_state = FilterState::errors_only();
    }
    if let Some(search) = &cli.search {
        state.filter_state.text_search = search.clone();
    }

    let result = monitor.open(&path)?;
    state.apply_load(&path, &result);

    print_analysis(&state, &path);
    write_exports(cli, &state, &path)?;

    if cli.watch {
        if monitor.is_monitoring() {
            watch_loop(&monitor, &mut state);
        } else {
            eprintln!("Live monitoring unavailable for {}", path.display());
        }
    }
    Ok(())
}

fn print_analysis(state: &AppState, path: &Path) {
    let snapshot = &state.snapshot;
    println!("{}", path.display());
    println!("{}", state.status_message);
    println!(
        "Errors: {} ({}%)  Warnings: {} ({}%)  Info: {}",
        snapshot.error_count(),
        snapshot.error_percentage(),
        snapshot.warning_count(),
        snapshot.warning_percentage(),
        snapshot.info_count()
    );

    let top = patterns::detect_patterns(snapshot);
    if !top.is_empty() {
        println!("\nTop error patterns:");
        for pattern in &top {
            println!("  {:>5}  {}", pattern.count, pattern.signature);
        }
    }

    let sources = patterns::errors_by_source(snapshot);
    if !sources.is_empty() {
        println!("\nErrors by source:");
        for source in &sources {
            println!("  {:>5}  {}", source.count, source.source);
        }
    }

    if !state.filter_state.is_empty() {
        println!("\nMatching entries ({}):", state.filtered_indices.len());
        for record in state.filtered_records() {
            println!(
                "  {}  [{}]  {}  {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.severity.export_label(),
                record.source,
                record.message
            );
        }
    }
}

fn write_exports(cli: &Cli, state: &AppState, log_path: &Path) -> error::Result<()> {
    if cli.csv.is_none() && cli.json.is_none() && cli.report.is_none() {
        return Ok(());
    }
    let records = state.filtered_records();

    if let Some(out) = &cli.csv {
        let rows = fs::write_atomic(out, |w| export::export_csv(&records, w, out))?;
        println!("Wrote {rows} rows to {}", out.display());
    }
    if let Some(out) = &cli.json {
        let rows = fs::write_atomic(out, |w| export::export_json(&records, w, out))?;
        println!("Wrote {rows} records to {}", out.display());
    }
    if let Some(out) = &cli.report {
        let top = patterns::detect_patterns(&state.snapshot);
        let generated_at = chrono::Local::now().naive_local();
        let report = export::to_report(&state.snapshot, &top, log_path, generated_at);
        fs::write_atomic(out, |w| export::export_report(&report, w, out))?;
        println!("Wrote report to {}", out.display());
    }
    Ok(())
}

/// Print reload notifications until the process is interrupted.
fn watch_loop(monitor: &LogMonitor, state: &mut AppState) {
    let tick = Duration::from_millis(constants::WATCH_CANCEL_CHECK_INTERVAL_MS * 10);
    loop {
        let Some(first) = monitor.wait_event(tick) else {
            continue;
        };
        let mut events = vec![first];
        events.extend(monitor.poll_events(constants::MAX_MONITOR_EVENTS_PER_POLL));

        for event in &events {
            state.apply_event(event);
            println!("{}", state.status_message);
            state.acknowledge_new_errors();
        }
        if !state.is_monitoring {
            return;
        }
    }
}
