// IntuneLens - app/mod.rs
//
// Application layer: ingestion, change watching, live monitoring and view
// state.
// Dependencies: core, platform.

pub mod ingest;
pub mod monitor;
pub mod state;
pub mod watcher;
