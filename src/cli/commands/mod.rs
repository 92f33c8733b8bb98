//! Command execution functions.
//!
//! Each command loads configuration the same way (file, then environment,
//! then command line flags) and reports failures with recovery suggestions.

mod plan;
mod upload;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::{DEFAULT_CONFIG_FILE, UploadConfig};
use crate::error::{ReleaseError, Result};
use std::path::Path;

use plan::execute_plan;
use upload::execute_upload;

/// Exit code for a successful run (including partial upload failures)
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when the release could not be created or finalized
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for invalid arguments or configuration
pub const EXIT_USAGE: i32 = 2;

/// Execute the main command and return the process exit code
///
/// Every failure is reported here, so callers only see an exit code.
pub async fn execute_command(args: Args) -> i32 {
    if let Err(validation_error) = args.validate() {
        // Create output for validation errors (never quiet)
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return EXIT_USAGE;
    }

    let config = RuntimeConfig::from(&args);

    let upload_config = match load_upload_config(&args) {
        Ok(upload_config) => upload_config,
        Err(e) => {
            report_failure(&config, &args, &e);
            return EXIT_USAGE;
        }
    };

    let result = match &args.command {
        Command::Upload { manifest, .. } => execute_upload(&config, manifest, &upload_config).await,
        Command::Plan { manifest } => execute_plan(&config, manifest, &upload_config),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            report_failure(&config, &args, &e);
            match e {
                ReleaseError::Config(_) | ReleaseError::Cli(_) => EXIT_USAGE,
                _ => EXIT_FAILURE,
            }
        }
    }
}

/// Resolve configuration: file, then environment, then flags
fn load_upload_config(args: &Args) -> Result<UploadConfig> {
    let mut upload_config = match &args.config {
        Some(path) => UploadConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => UploadConfig::load(DEFAULT_CONFIG_FILE)?,
        None => {
            log::debug!("No {} found; using defaults and environment", DEFAULT_CONFIG_FILE);
            UploadConfig::default()
        }
    };

    upload_config.apply_env();

    if let Command::Upload {
        release_version,
        auth_token,
        ..
    } = &args.command
    {
        if let Some(version) = release_version {
            upload_config.version = version.clone();
        }
        if let Some(token) = auth_token {
            upload_config.auth_token = token.clone();
        }
        upload_config.validate()?;
    }

    Ok(upload_config)
}

fn report_failure(config: &RuntimeConfig, args: &Args, error: &ReleaseError) {
    config.error_println(&format!(
        "Command '{}' failed: {}",
        args.command.name(),
        error
    ));

    // Hints go to stderr with the error so --quiet keeps them
    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.hint_println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.hint_println(&format!("  • {}", suggestion));
        }
    }
}
