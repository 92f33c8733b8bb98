//! Release workflow driven once per completed build.
//!
//! A run walks `Idle -> Discovering -> ReleaseCreating -> Uploading ->
//! Finalizing -> Done`. Only a failed release creation ends in `Aborted`;
//! upload failures are recorded per artifact and never stop the run.

mod outcome;

pub use outcome::{
    BuildDiagnostics, BuildOutcome, FatalError, UploadOutcome, UploadReport, UploadWarning,
};

use crate::build::{
    Artifact, BuildOutput, NameCollision, PublicPathResolver, discover_artifacts, sourcemap_link,
};
use crate::client::ReleaseApi;
use crate::config::UploadConfig;
use futures::stream::{self, StreamExt};
use std::fmt;

/// State of one upload run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Nothing started
    Idle,
    /// Scanning build chunks
    Discovering,
    /// Registering the release
    ReleaseCreating,
    /// Uploading artifacts
    Uploading,
    /// Marking the release deployed
    Finalizing,
    /// Run finished (successfully or with a finalize failure)
    Done,
    /// Release creation failed; nothing was uploaded
    Aborted,
}

impl UploadPhase {
    /// Whether `next` directly follows this phase
    pub fn can_advance_to(self, next: UploadPhase) -> bool {
        use UploadPhase::*;
        matches!(
            (self, next),
            (Idle, Discovering)
                | (Idle, Done)
                | (Discovering, ReleaseCreating)
                | (ReleaseCreating, Uploading)
                | (ReleaseCreating, Aborted)
                | (Uploading, Finalizing)
                | (Finalizing, Done)
        )
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadPhase::Idle => "idle",
            UploadPhase::Discovering => "discovering",
            UploadPhase::ReleaseCreating => "creating release",
            UploadPhase::Uploading => "uploading",
            UploadPhase::Finalizing => "finalizing",
            UploadPhase::Done => "done",
            UploadPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// One artifact with its resolved public name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    /// Artifact selected from the build
    pub artifact: Artifact,
    /// Tilde-prefixed name the artifact is uploaded under
    pub public_name: String,
    /// `Sourcemap:` link sent with scripts
    pub sourcemap_link: Option<String>,
}

/// Discovery and path resolution for a build, without network access
#[derive(Debug, Clone, Default)]
pub struct UploadPlan {
    /// Artifacts to upload, ordered by name
    pub uploads: Vec<PlannedUpload>,
    /// Names emitted by more than one chunk
    pub collisions: Vec<NameCollision>,
    /// Names with no location on disk
    pub unlocated: Vec<String>,
}

impl UploadPlan {
    /// Build a plan from configuration and build output
    pub fn new<B: BuildOutput + ?Sized>(config: &UploadConfig, build: &B) -> Self {
        let discovery = discover_artifacts(build);
        let resolver = PublicPathResolver::new(
            &config.public_path_map,
            config.default_public_path.as_deref(),
            build.public_path(),
        );

        let uploads = discovery
            .artifacts
            .into_iter()
            .map(|artifact| PlannedUpload {
                public_name: resolver.resolve(&artifact.name),
                sourcemap_link: (!artifact.is_source_map)
                    .then(|| sourcemap_link(&artifact.name))
                    .flatten(),
                artifact,
            })
            .collect();

        Self {
            uploads,
            collisions: discovery.collisions,
            unlocated: discovery.unlocated,
        }
    }

    /// Human-readable discovery observations
    pub fn notices(&self) -> Vec<String> {
        let mut notices: Vec<String> = self
            .collisions
            .iter()
            .map(|c| {
                format!(
                    "{} is emitted by several chunks ({}); uploaded once",
                    c.name,
                    c.chunks.join(", ")
                )
            })
            .collect();
        notices.extend(
            self.unlocated
                .iter()
                .map(|name| format!("{} has no location on disk; not uploaded", name)),
        );
        notices
    }
}

/// Drives create → upload → finalize against a [`ReleaseApi`]
pub struct UploadOrchestrator<A> {
    client: A,
}

impl<A: ReleaseApi> UploadOrchestrator<A> {
    /// Create an orchestrator around a release API
    pub fn new(client: A) -> Self {
        Self { client }
    }

    /// Release API in use
    pub fn client(&self) -> &A {
        &self.client
    }

    /// Run the whole workflow for one build
    ///
    /// Never returns early with an error: every failure is folded into the
    /// returned [`BuildOutcome`], which is the single completion signal.
    pub async fn run<B: BuildOutput + ?Sized>(
        &self,
        config: &UploadConfig,
        build: &B,
    ) -> BuildOutcome {
        let version = config.version.as_str();

        if !config.enabled {
            log::info!("Source map upload disabled; skipping release {}", version);
            return BuildOutcome::Success(UploadReport::skipped(version));
        }

        let mut report = UploadReport::new(version);

        // Discovery
        advance(&mut report, UploadPhase::Discovering);
        let plan = UploadPlan::new(config, build);
        report.notices = plan.notices();
        log::info!(
            "Discovered {} artifact(s) for release {}",
            plan.uploads.len(),
            version
        );

        // Phase 1: create release
        advance(&mut report, UploadPhase::ReleaseCreating);
        match self
            .client
            .create_release(version, &config.release_metadata())
            .await
        {
            Ok(record) => {
                log::info!("Created release {}", version);
                report.release = Some(record);
            }
            Err(e) => {
                log::error!("Release creation failed for {}: {}", version, e);
                advance(&mut report, UploadPhase::Aborted);
                return BuildOutcome::Fatal(FatalError {
                    phase: UploadPhase::ReleaseCreating,
                    message: format!("Failed to create release {}", version),
                    detail: error_chain(&e),
                    report,
                });
            }
        }

        // Phase 2: upload every artifact, isolating failures
        advance(&mut report, UploadPhase::Uploading);
        report.outcomes = self.upload_all(config, version, &plan.uploads).await;
        report.warnings = report
            .outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| UploadWarning {
                artifact: o.artifact.name.clone(),
                message: o.error.clone().unwrap_or_default(),
            })
            .collect();
        log::info!(
            "Uploaded {}/{} artifact(s) for release {}",
            report.uploaded_count(),
            report.outcomes.len(),
            version
        );

        // Phase 3: finalize regardless of upload failures
        advance(&mut report, UploadPhase::Finalizing);
        let finalized = self.client.finalize_release(version).await;
        advance(&mut report, UploadPhase::Done);

        match finalized {
            Ok(record) => {
                log::info!("Finalized release {}", version);
                report.finalized = Some(record);
                if report.warnings.is_empty() {
                    BuildOutcome::Success(report)
                } else {
                    BuildOutcome::PartialSuccess(report)
                }
            }
            Err(e) => {
                log::error!("Finalize failed for {}: {}", version, e);
                BuildOutcome::Fatal(FatalError {
                    phase: UploadPhase::Finalizing,
                    message: format!("Failed to finalize release {}", version),
                    detail: error_chain(&e),
                    report,
                })
            }
        }
    }

    /// Upload all planned artifacts and wait for every attempt to settle
    async fn upload_all(
        &self,
        config: &UploadConfig,
        version: &str,
        uploads: &[PlannedUpload],
    ) -> Vec<UploadOutcome> {
        let width = match config.max_concurrent_uploads {
            0 => uploads.len(),
            n => n,
        }
        .max(1);

        let mut outcomes: Vec<UploadOutcome> = stream::iter(uploads)
            .map(|planned| async move {
                let result = self
                    .client
                    .upload_artifact(version, &planned.artifact, &planned.public_name)
                    .await;
                match result {
                    Ok(record) => {
                        log::debug!("Uploaded {} as {}", planned.artifact.name, planned.public_name);
                        UploadOutcome {
                            artifact: planned.artifact.clone(),
                            public_name: planned.public_name.clone(),
                            succeeded: true,
                            error: None,
                            record: Some(record),
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to upload {}: {}", planned.artifact.name, e);
                        UploadOutcome {
                            artifact: planned.artifact.clone(),
                            public_name: planned.public_name.clone(),
                            succeeded: false,
                            error: Some(error_chain(&e)),
                            record: None,
                        }
                    }
                }
            })
            .buffer_unordered(width)
            .collect()
            .await;

        outcomes.sort_by(|a, b| a.artifact.name.cmp(&b.artifact.name));
        outcomes
    }
}

fn advance(report: &mut UploadReport, next: UploadPhase) {
    if !report.final_phase.can_advance_to(next) {
        log::warn!("Unexpected phase change {} -> {}", report.final_phase, next);
    }
    log::debug!("Release {}: {} -> {}", report.version, report.final_phase, next);
    report.final_phase = next;
}

/// Error text followed by its cause chain
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\n  caused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
