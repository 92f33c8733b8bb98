//! Command line interface for sourcemap_release.
//!
//! This module is the build-tool adapter: it loads configuration and a build
//! manifest, runs the upload workflow, and turns the outcome into terminal
//! output and an exit code.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

/// Main CLI entry point; returns the process exit code
pub async fn run() -> i32 {
    let args = Args::parse_args();
    execute_command(args).await
}
