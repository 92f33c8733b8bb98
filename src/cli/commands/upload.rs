//! `upload` command: run the release workflow for one build.

use super::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::build::BuildManifest;
use crate::cli::RuntimeConfig;
use crate::client::ReleaseClient;
use crate::config::UploadConfig;
use crate::error::Result;
use crate::orchestrator::{BuildDiagnostics, BuildOutcome, UploadOrchestrator};
use std::path::Path;

/// Execute the upload command
pub(super) async fn execute_upload(
    config: &RuntimeConfig,
    manifest_path: &Path,
    upload_config: &UploadConfig,
) -> Result<i32> {
    if !upload_config.enabled {
        config.println("Source map upload is disabled; nothing to do");
        return Ok(EXIT_SUCCESS);
    }

    config.section(&format!("Release {}", upload_config.version));
    let manifest = BuildManifest::load(manifest_path)?;
    config.verbose_println(&format!("Manifest: {}", manifest_path.display()));

    let client = ReleaseClient::new(upload_config)?;
    config.verbose_println(&format!("API: {}", client.project_url()));

    let orchestrator = UploadOrchestrator::new(client);
    let outcome = orchestrator.run(upload_config, &manifest).await;

    if config.is_verbose() {
        for result in outcome.report().outcomes.iter().filter(|o| o.succeeded) {
            config.verbose_println(&format!("✓ {} → {}", result.artifact.name, result.public_name));
        }
    }

    let mut diagnostics = BuildDiagnostics::default();
    outcome.report_to(&mut diagnostics);
    for warning in &diagnostics.warnings {
        config.warning_println(warning);
    }

    match &outcome {
        BuildOutcome::Success(report) => {
            config.success_println(&format!(
                "Uploaded {} artifact(s) and finalized release {}",
                report.uploaded_count(),
                report.version
            ));
            Ok(EXIT_SUCCESS)
        }
        BuildOutcome::PartialSuccess(report) => {
            config.success_println(&format!(
                "Finalized release {} ({} uploaded, {} failed)",
                report.version,
                report.uploaded_count(),
                report.failed_count()
            ));
            Ok(EXIT_SUCCESS)
        }
        BuildOutcome::Fatal(fatal) => {
            config.error_println(&format!("{} (during {})", fatal.message, fatal.phase));
            for line in fatal.detail.lines() {
                config.indent(line);
            }
            Ok(EXIT_FAILURE)
        }
    }
}
