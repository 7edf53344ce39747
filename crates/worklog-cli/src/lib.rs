//! Worklog command-line application.
//!
//! The binary in `main.rs` only parses arguments, loads configuration and
//! installs logging; everything it runs lives here so integration tests can
//! drive the same code path.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;

pub use commands::{run, run_with_clock};
