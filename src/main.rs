//! sourcemap_release - upload build source maps to an error-tracking release.

use sourcemap_release::cli;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    // Failures are reported inside the CLI layer; only the exit code surfaces here
    process::exit(cli::run().await);
}
