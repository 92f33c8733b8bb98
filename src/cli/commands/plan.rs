//! `plan` command: preview discovery and public names without network access.

use super::EXIT_SUCCESS;
use crate::build::BuildManifest;
use crate::cli::RuntimeConfig;
use crate::config::UploadConfig;
use crate::error::Result;
use crate::orchestrator::UploadPlan;
use std::path::Path;

/// Execute the plan command
pub(super) fn execute_plan(
    config: &RuntimeConfig,
    manifest_path: &Path,
    upload_config: &UploadConfig,
) -> Result<i32> {
    let manifest = BuildManifest::load(manifest_path)?;
    let plan = UploadPlan::new(upload_config, &manifest);

    if !upload_config.enabled {
        config.warning_println("Upload is disabled in configuration; plan shown for reference");
    }

    if plan.uploads.is_empty() {
        let _ = config.output().info("No scripts or source maps found in the build");
    }

    for planned in &plan.uploads {
        match &planned.sourcemap_link {
            Some(link) => config.println(&format!("{}  [{}]", planned.public_name, link)),
            None => config.println(&planned.public_name),
        }
        config.verbose_println(&format!("from {}", planned.artifact.path.display()));
    }

    for notice in plan.notices() {
        config.warning_println(&notice);
    }

    config.success_println(&format!("{} artifact(s) would be uploaded", plan.uploads.len()));
    Ok(EXIT_SUCCESS)
}
