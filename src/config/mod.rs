//! Upload configuration loading and validation.
//!
//! Configuration is read from a TOML file, overlaid with environment
//! variables, validated once, and then passed by value into the client and
//! orchestrator. Nothing here is process-global.

mod retry;

pub use retry::{MAX_RETRIES, MAX_RETRY_DELAY_MS, RetryPolicy};

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sourcemap-release.toml";

/// Default base URL of the release API
pub const DEFAULT_API_URL: &str = "https://sentry.io/";

/// Which endpoint marks a release as finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalizeEndpoint {
    /// `PUT releases/{version}/` with `dateReleased`
    #[default]
    #[serde(rename = "release")]
    ReleaseRoot,
    /// `POST releases/{version}/deploy/` (legacy contract)
    Deploy,
}

/// Repository/commit reference attached to a new release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    /// Repository name as known to the tracking service
    pub repository: String,
    /// Commit the release was built from
    pub commit: String,
    /// Commit of the previous release, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_commit: Option<String>,
}

/// Explicit commit entry attached to a new release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSpec {
    /// Commit SHA
    pub id: String,
    /// Repository the commit belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Commit message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Author email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Commit time (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Optional metadata sent with release creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseMetadata {
    /// Single VCS ref (tag, branch or SHA)
    pub git_ref: Option<String>,
    /// Repository refs
    pub refs: Vec<RepositoryRef>,
    /// Explicit commits
    pub commits: Vec<CommitSpec>,
}

/// Complete configuration for one upload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Base URL of the release API
    pub url: String,
    /// Organization slug
    pub organization: String,
    /// Project slug
    pub project: String,
    /// Bearer token
    pub auth_token: String,
    /// Release version, used verbatim
    pub version: String,
    /// Whether uploading runs at all
    pub enabled: bool,
    /// Per-artifact public path overrides
    #[serde(alias = "public_paths")]
    pub public_path_map: BTreeMap<String, String>,
    /// Public path for artifacts without an override
    pub default_public_path: Option<String>,
    /// Single VCS ref for release creation
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Repository refs for release creation
    pub refs: Vec<RepositoryRef>,
    /// Explicit commits for release creation
    pub commits: Vec<CommitSpec>,
    /// Environment name sent with the deploy finalize contract
    pub environment: Option<String>,
    /// Finalize contract in effect
    pub finalize: FinalizeEndpoint,
    /// Retries after the first attempt
    pub retries: u32,
    /// Delay between attempts (milliseconds)
    pub retry_delay_ms: u64,
    /// Per-request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,
    /// Upload concurrency width (0 = unbounded)
    pub max_concurrent_uploads: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            organization: String::new(),
            project: String::new(),
            auth_token: String::new(),
            version: String::new(),
            enabled: true,
            public_path_map: BTreeMap::new(),
            default_public_path: None,
            git_ref: None,
            refs: Vec::new(),
            commits: Vec::new(),
            environment: None,
            finalize: FinalizeEndpoint::ReleaseRoot,
            retries: 5,
            retry_delay_ms: 1000,
            timeout_secs: 60,
            max_concurrent_uploads: 10,
        }
    }
}

impl UploadConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable source
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe a value from the file.
    pub fn apply_env_with<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SENTRY_URL") {
            self.url = v;
        }
        if let Some(v) = non_empty("SENTRY_ORG") {
            self.organization = v;
        }
        if let Some(v) = non_empty("SENTRY_PROJECT") {
            self.project = v;
        }
        if let Some(v) = non_empty("SENTRY_AUTH_TOKEN") {
            self.auth_token = v;
        }
        if let Some(v) = non_empty("SOURCEMAP_RELEASE_VERSION") {
            self.version = v;
        }
        if let Some(v) =
            RetryPolicy::parse_clamped(non_empty("SOURCEMAP_RELEASE_RETRIES"), MAX_RETRIES as u64)
        {
            self.retries = v as u32;
        }
        if let Some(v) = RetryPolicy::parse_clamped(
            non_empty("SOURCEMAP_RELEASE_RETRY_DELAY_MS"),
            MAX_RETRY_DELAY_MS,
        ) {
            self.retry_delay_ms = v;
        }
    }

    /// Validate the configuration before any network access
    ///
    /// A disabled configuration is always valid: nothing will be sent.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        for (field, value) in [
            ("organization", &self.organization),
            ("project", &self.project),
            ("auth_token", &self.auth_token),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                }
                .into());
            }
        }

        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidValue {
            field: "url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "url".to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }
            .into());
        }

        if self.retries > MAX_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "retries".to_string(),
                reason: format!("{} exceeds maximum of {}", self.retries, MAX_RETRIES),
            }
            .into());
        }

        Ok(())
    }

    /// Retry policy derived from the configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.retry_delay_ms)
    }

    /// Per-request timeout, if enabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Metadata to attach on release creation
    pub fn release_metadata(&self) -> ReleaseMetadata {
        ReleaseMetadata {
            git_ref: self.git_ref.clone(),
            refs: self.refs.clone(),
            commits: self.commits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> UploadConfig {
        UploadConfig {
            organization: "acme".to_string(),
            project: "web".to_string(),
            auth_token: "secret".to_string(),
            version: "v1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert!(config.enabled);
        assert_eq!(config.retries, 5);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.finalize, FinalizeEndpoint::ReleaseRoot);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_full_toml() {
        let config = UploadConfig::from_toml_str(
            r#"
            organization = "acme"
            project = "web"
            auth_token = "secret"
            version = "2024.1"
            default_public_path = "/static/"
            ref = "main"
            finalize = "deploy"
            environment = "production"
            timeout_secs = 0

            [public_path_map]
            "vendor.js" = "/cdn/"

            [[refs]]
            repository = "acme/web"
            commit = "abc123"
            previous_commit = "def456"

            [[commits]]
            id = "abc123"
            message = "Fix checkout"
            "#,
        )
        .unwrap();

        assert_eq!(config.version, "2024.1");
        assert_eq!(config.git_ref.as_deref(), Some("main"));
        assert_eq!(config.finalize, FinalizeEndpoint::Deploy);
        assert_eq!(config.public_path_map["vendor.js"], "/cdn/");
        assert_eq!(config.refs[0].previous_commit.as_deref(), Some("def456"));
        assert_eq!(config.commits[0].message.as_deref(), Some("Fix checkout"));
        assert_eq!(config.request_timeout(), None);
        assert!(config.enabled);
    }

    #[test]
    fn test_public_paths_alias() {
        let config = UploadConfig::from_toml_str(
            r#"
            [public_paths]
            "app.js" = "/assets/"
            "#,
        )
        .unwrap();
        assert_eq!(config.public_path_map["app.js"], "/assets/");
    }

    #[test]
    fn test_validate_missing_field() {
        let config = UploadConfig {
            auth_token: String::new(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth_token"));
    }

    #[test]
    fn test_validate_disabled_skips_checks() {
        let config = UploadConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = UploadConfig {
            url: "ftp://sentry.example".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SENTRY_AUTH_TOKEN", "from-env"),
            ("SENTRY_ORG", ""),
            ("SOURCEMAP_RELEASE_RETRIES", "99"),
            ("SOURCEMAP_RELEASE_RETRY_DELAY_MS", "250"),
        ]);
        let mut config = valid();
        config.apply_env_with(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.auth_token, "from-env");
        assert_eq!(config.organization, "acme");
        assert_eq!(config.retries, MAX_RETRIES);
        assert_eq!(config.retry_policy().delay, Duration::from_millis(250));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let reference = RepositoryRef {
            repository: "acme/web".to_string(),
            commit: "abc".to_string(),
            previous_commit: Some("def".to_string()),
        };
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["previousCommit"], "def");
    }
}
