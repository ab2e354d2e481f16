// IntuneLens - core/mod.rs
//
// Core business logic layer.
// Dependencies: util layer, chrono, regex, serde, csv.
// Must NOT depend on: platform, app, or touch the filesystem directly.

pub mod export;
pub mod filter;
pub mod model;
pub mod parser;
pub mod patterns;
pub mod store;
