//! Release API client.
//!
//! Three calls make up a release: create, upload each file, finalize. They are
//! expressed by the [`ReleaseApi`] trait so the orchestrator can be driven by
//! the HTTP implementation, [`ReleaseClient`], or by a test double.

mod records;
mod retry;

pub use records::{ReleaseRecord, UploadRecord};
pub use retry::retry_with_delay;

use crate::build::{Artifact, sourcemap_link};
use crate::config::{FinalizeEndpoint, ReleaseMetadata, RetryPolicy, UploadConfig};
use crate::error::{ClientError, ConfigError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, RequestBuilder, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Result type for release API calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Longest response body excerpt kept in an error
const MAX_ERROR_BODY: usize = 512;

/// Operations the release workflow needs from the tracking service
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    /// Register a new release
    async fn create_release(
        &self,
        version: &str,
        metadata: &ReleaseMetadata,
    ) -> ClientResult<ReleaseRecord>;

    /// Attach one artifact to a release under its public name
    async fn upload_artifact(
        &self,
        version: &str,
        artifact: &Artifact,
        public_name: &str,
    ) -> ClientResult<UploadRecord>;

    /// Mark a release as deployed
    async fn finalize_release(&self, version: &str) -> ClientResult<ReleaseRecord>;
}

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    version: &'a str,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    git_ref: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    refs: &'a [crate::config::RepositoryRef],
    #[serde(skip_serializing_if = "is_empty_slice")]
    commits: &'a [crate::config::CommitSpec],
}

fn is_empty_slice<T>(items: &&[T]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinalizeBody<'a> {
    projects: [&'a str; 1],
    date_released: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a str>,
}

/// HTTP implementation of [`ReleaseApi`]
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    /// `{url}/api/0/projects/{organization}/{project}`
    project_url: Url,
    auth_token: String,
    project: String,
    finalize: FinalizeEndpoint,
    environment: Option<String>,
    retry: RetryPolicy,
}

impl ReleaseClient {
    /// Create a client from validated configuration
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let mut project_url = Url::parse(&config.url).map_err(|e| ConfigError::InvalidValue {
            field: "url".to_string(),
            reason: e.to_string(),
        })?;
        project_url
            .path_segments_mut()
            .map_err(|_| ConfigError::InvalidValue {
                field: "url".to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend([
                "api",
                "0",
                "projects",
                config.organization.as_str(),
                config.project.as_str(),
            ]);

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ConfigError::InvalidValue {
            field: "url".to_string(),
            reason: format!("cannot build HTTP client: {}", e),
        })?;

        Ok(Self {
            http,
            project_url,
            auth_token: config.auth_token.clone(),
            project: config.project.clone(),
            finalize: config.finalize,
            environment: config.environment.clone(),
            retry: config.retry_policy(),
        })
    }

    /// Base URL all endpoints hang off
    pub fn project_url(&self) -> &Url {
        &self.project_url
    }

    /// Endpoint URL with each segment percent-encoded and a trailing slash
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.project_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        self.http
            .request(method, url.clone())
            .bearer_auth(&self.auth_token)
    }

    /// Send with retries and return the raw 2xx body
    async fn execute<F>(&self, operation: &str, build: F) -> ClientResult<Bytes>
    where
        F: Fn() -> ClientResult<RequestBuilder> + Sync,
    {
        retry_with_delay(
            || async {
                let request = build()?;
                let response = request.send().await.map_err(|e| transport(operation, &e))?;
                let status = response.status();
                let body = response.bytes().await.map_err(|e| transport(operation, &e))?;
                log::debug!("{} -> HTTP {} ({} bytes)", operation, status.as_u16(), body.len());

                if !status.is_success() {
                    return Err(ClientError::Api {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        body: excerpt(&body),
                    });
                }
                Ok(body)
            },
            self.retry,
            operation,
        )
        .await
    }

    async fn send_json<B, T>(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: &B,
    ) -> ClientResult<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        log::debug!("{} {} {}", operation, method, url);
        let payload = self
            .execute(operation, || Ok(self.request(method.clone(), &url).json(body)))
            .await?;
        decode(operation, &payload)
    }
}

#[async_trait]
impl ReleaseApi for ReleaseClient {
    async fn create_release(
        &self,
        version: &str,
        metadata: &ReleaseMetadata,
    ) -> ClientResult<ReleaseRecord> {
        let body = CreateReleaseBody {
            version,
            git_ref: metadata.git_ref.as_deref(),
            refs: &metadata.refs,
            commits: &metadata.commits,
        };
        let record = self
            .send_json("create release", Method::POST, self.endpoint(&["releases"]), &body)
            .await?;
        Ok(record.unwrap_or_else(|| ReleaseRecord::for_version(version)))
    }

    async fn upload_artifact(
        &self,
        version: &str,
        artifact: &Artifact,
        public_name: &str,
    ) -> ClientResult<UploadRecord> {
        let operation = format!("upload {}", artifact.name);
        let content = Bytes::from(tokio::fs::read(&artifact.path).await.map_err(|source| {
            ClientError::ArtifactRead {
                path: artifact.path.clone(),
                source,
            }
        })?);
        let link = (!artifact.is_source_map)
            .then(|| sourcemap_link(&artifact.name))
            .flatten();
        let file_name = artifact
            .name
            .rsplit('/')
            .next()
            .unwrap_or(&artifact.name)
            .to_string();
        let url = self.endpoint(&["releases", version, "files"]);

        log::debug!("{} as {} ({} bytes)", operation, public_name, content.len());
        let payload = self
            .execute(&operation, || {
                let file = multipart::Part::stream_with_length(content.clone(), content.len() as u64)
                    .file_name(file_name.clone());
                let mut form = multipart::Form::new()
                    .part("file", file)
                    .text("name", public_name.to_string());
                if let Some(link) = &link {
                    form = form.text("header", link.clone());
                }
                Ok(self.request(Method::POST, &url).multipart(form))
            })
            .await?;

        let record: Option<UploadRecord> = decode(&operation, &payload)?;
        Ok(record.unwrap_or_else(|| UploadRecord {
            name: public_name.to_string(),
            size: Some(content.len() as u64),
            ..Default::default()
        }))
    }

    async fn finalize_release(&self, version: &str) -> ClientResult<ReleaseRecord> {
        let body = FinalizeBody {
            projects: [self.project.as_str()],
            date_released: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            environment: match self.finalize {
                FinalizeEndpoint::Deploy => self.environment.as_deref(),
                FinalizeEndpoint::ReleaseRoot => None,
            },
        };
        let (method, url) = match self.finalize {
            FinalizeEndpoint::ReleaseRoot => (Method::PUT, self.endpoint(&["releases", version])),
            FinalizeEndpoint::Deploy => (
                Method::POST,
                self.endpoint(&["releases", version, "deploy"]),
            ),
        };

        let record: Option<ReleaseRecord> =
            self.send_json("finalize release", method, url, &body).await?;
        let mut record = record.unwrap_or_default();
        if record.version.is_empty() {
            record.version = version.to_string();
        }
        Ok(record)
    }
}

fn transport(operation: &str, error: &reqwest::Error) -> ClientError {
    let mut reason = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    ClientError::Transport {
        operation: operation.to_string(),
        reason,
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_ERROR_BODY).collect();
    format!("{}…", cut)
}

/// Parse a JSON body; empty bodies decode to `None`
fn decode<T: DeserializeOwned>(operation: &str, body: &[u8]) -> ClientResult<Option<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ClientError::Encoding {
            operation: operation.to_string(),
            reason: format!("{} (body: {})", e, excerpt(body)),
        })
}
