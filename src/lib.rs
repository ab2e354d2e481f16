// IntuneLens - lib.rs
//
// Library entry point, exposing every layer for the `intunelens` binary and
// for integration testing.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
