//! Error types for sourcemap_release operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sourcemap_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all sourcemap_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Release API errors
    #[error("Release API error: {0}")]
    Client(#[from] ClientError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while talking to the release API
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network-level failure (connect, timeout, reset)
    #[error("Transport failure during {operation}: {reason}")]
    Transport {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },

    /// Non-2xx HTTP response
    #[error("{operation} returned HTTP {status}: {body}")]
    Api {
        /// Operation that failed
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Malformed or non-JSON response body
    #[error("Malformed response for {operation}: {reason}")]
    Encoding {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },

    /// Artifact could not be read from disk
    #[error("Cannot read artifact {path}: {source}")]
    ArtifactRead {
        /// Path of the artifact
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {path}")]
    NotFound {
        /// Path that was searched
        path: PathBuf,
    },

    /// Required field missing or empty
    #[error("Missing required configuration field '{field}'")]
    MissingField {
        /// Field name
        field: String,
    },

    /// Field present but invalid
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl ClientError {
    /// Whether another attempt could plausibly succeed
    ///
    /// Transport failures and HTTP 408, 429 and 5xx are retried; every other
    /// status and any malformed body is returned to the caller immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::Api { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            ClientError::Encoding { .. } | ClientError::ArtifactRead { .. } => false,
        }
    }

    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Client(ClientError::Api { status: 401, .. })
            | ReleaseError::Client(ClientError::Api { status: 403, .. }) => vec![
                "Verify the auth token is valid (SENTRY_AUTH_TOKEN or auth_token)".to_string(),
                "Ensure the token has the project:releases scope".to_string(),
            ],
            ReleaseError::Client(ClientError::Api { status: 404, .. }) => vec![
                "Check the organization and project slugs in the configuration".to_string(),
                "Check that the release was created before uploading files".to_string(),
            ],
            ReleaseError::Client(ClientError::Api { status: 409, .. }) => vec![
                "A release with this version may already exist; choose a new version".to_string(),
            ],
            ReleaseError::Client(ClientError::Transport { .. }) => vec![
                "Check network connectivity to the release API".to_string(),
                "Increase retries or timeout_secs in the configuration".to_string(),
            ],
            ReleaseError::Config(ConfigError::NotFound { path }) => vec![
                format!("Create {} or pass --config <FILE>", path.display()),
            ],
            ReleaseError::Config(ConfigError::MissingField { field }) => vec![
                format!("Set '{}' in the configuration file", field),
                "Or provide it through the matching SENTRY_* environment variable".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            ReleaseError::Client(e) => e.is_retryable(),
            _ => false,
        }
    }
}
