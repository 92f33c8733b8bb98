//! Structured results of one upload run.

use super::UploadPhase;
use crate::build::Artifact;
use crate::client::{ReleaseRecord, UploadRecord};
use std::fmt;
use thiserror::Error;

/// Result of one artifact upload attempt
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Artifact that was attempted
    pub artifact: Artifact,
    /// Name the artifact was uploaded under
    pub public_name: String,
    /// Whether the upload was accepted
    pub succeeded: bool,
    /// Failure detail when `succeeded` is false
    pub error: Option<String>,
    /// Server record when `succeeded` is true
    pub record: Option<UploadRecord>,
}

/// Non-fatal failure of a single artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadWarning {
    /// Artifact output name
    pub artifact: String,
    /// Failure detail
    pub message: String,
}

impl fmt::Display for UploadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to upload source maps for: {} ({})", self.artifact, self.message)
    }
}

/// Everything that happened during one run
#[derive(Debug, Clone)]
pub struct UploadReport {
    /// Release version
    pub version: String,
    /// True when the run was gated off by configuration
    pub skipped: bool,
    /// Phase the run ended in
    pub final_phase: UploadPhase,
    /// Record returned by release creation
    pub release: Option<ReleaseRecord>,
    /// Record returned by finalize
    pub finalized: Option<ReleaseRecord>,
    /// Per-artifact results, ordered by artifact name
    pub outcomes: Vec<UploadOutcome>,
    /// Failed uploads, ordered by artifact name
    pub warnings: Vec<UploadWarning>,
    /// Discovery observations (duplicate names, missing files)
    pub notices: Vec<String>,
}

impl UploadReport {
    pub(crate) fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            skipped: false,
            final_phase: UploadPhase::Idle,
            release: None,
            finalized: None,
            outcomes: Vec::new(),
            warnings: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub(crate) fn skipped(version: &str) -> Self {
        Self {
            skipped: true,
            final_phase: UploadPhase::Done,
            ..Self::new(version)
        }
    }

    /// Number of artifacts that uploaded successfully
    pub fn uploaded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Number of artifacts that failed to upload
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }
}

/// Failure that invalidates the whole release
#[derive(Debug, Clone, Error)]
#[error("{message}: {detail}")]
pub struct FatalError {
    /// Phase that failed
    pub phase: UploadPhase,
    /// Short summary
    pub message: String,
    /// Error text including its cause chain
    pub detail: String,
    /// Work completed before the failure
    pub report: UploadReport,
}

/// Completion signal for one build
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Release created, every artifact uploaded, release finalized
    Success(UploadReport),
    /// Release finalized but some artifacts failed to upload
    PartialSuccess(UploadReport),
    /// Release creation or finalize failed
    Fatal(FatalError),
}

impl BuildOutcome {
    /// Whether the build should treat the run as successful
    pub fn is_success(&self) -> bool {
        !matches!(self, BuildOutcome::Fatal(_))
    }

    /// Report of the run, whatever its outcome
    pub fn report(&self) -> &UploadReport {
        match self {
            BuildOutcome::Success(report) | BuildOutcome::PartialSuccess(report) => report,
            BuildOutcome::Fatal(fatal) => &fatal.report,
        }
    }

    /// Per-artifact warnings
    pub fn warnings(&self) -> &[UploadWarning] {
        &self.report().warnings
    }

    /// Append this outcome to a build tool's warning and error lists
    pub fn report_to(&self, diagnostics: &mut BuildDiagnostics) {
        let report = self.report();
        diagnostics.warnings.extend(report.notices.iter().cloned());
        diagnostics
            .warnings
            .extend(report.warnings.iter().map(ToString::to_string));

        if let BuildOutcome::Fatal(fatal) = self {
            diagnostics.errors.push(format!(
                "\nFailed to upload source maps: \n\n{}\n{}",
                fatal.message, fatal.detail
            ));
        }
    }
}

/// Warning and error sinks owned by the host build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDiagnostics {
    /// Non-fatal messages
    pub warnings: Vec<String>,
    /// Messages that fail the build
    pub errors: Vec<String>,
}

impl BuildDiagnostics {
    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
