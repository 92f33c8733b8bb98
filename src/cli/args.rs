//! Command line argument parsing and validation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Upload build source maps to a release and finalize it
#[derive(Parser, Debug)]
#[command(
    name = "sourcemap_release",
    version,
    about = "Upload build source maps to a release and finalize it",
    long_about = "Create a release on the error-tracking service, upload every emitted
script and source map under its public path, then finalize the release.

Usage:
  sourcemap_release upload --manifest dist/stats.json
  sourcemap_release upload --manifest dist/stats.json --release-version 2024.05.1
  sourcemap_release plan --manifest dist/stats.json"
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./sourcemap-release.toml when present)
    #[arg(long, short = 'c', global = true, value_name = "FILE", env = "SOURCEMAP_RELEASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only print errors and their recovery suggestions
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print per-artifact details
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the release, upload artifacts, and finalize
    Upload {
        /// Build manifest (JSON) describing chunks and emitted files
        #[arg(long, short = 'm', value_name = "FILE")]
        manifest: PathBuf,

        /// Release version (overrides configuration)
        #[arg(long, value_name = "VERSION")]
        release_version: Option<String>,

        /// Auth token (overrides configuration and SENTRY_AUTH_TOKEN)
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
    },

    /// Show which artifacts would be uploaded and under which names
    Plan {
        /// Build manifest (JSON) describing chunks and emitted files
        #[arg(long, short = 'm', value_name = "FILE")]
        manifest: PathBuf,
    },
}

impl Command {
    /// Subcommand name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Upload { .. } => "upload",
            Command::Plan { .. } => "plan",
        }
    }

    /// Manifest path shared by every subcommand
    pub fn manifest(&self) -> &PathBuf {
        match self {
            Command::Upload { manifest, .. } | Command::Plan { manifest } => manifest,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.command.manifest().as_os_str().is_empty() {
            return Err("Build manifest path is required".to_string());
        }

        if let Command::Upload {
            release_version: Some(version),
            ..
        } = &self.command
            && version.trim().is_empty()
        {
            return Err("--release-version must not be empty".to_string());
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print message only in verbose mode
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print a hint alongside an error (always shown)
    pub fn hint_println(&self, message: &str) {
        self.output.hint(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
