// IntuneLens - platform/mod.rs
//
// Platform abstraction layer: filesystem access and configuration.
// Dependencies: standard library, directories crate, core model types.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
