//! Selection of uploadable artifacts from build chunks.

use super::BuildOutput;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A script or source map selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Output name as emitted by the build (may contain `/`)
    pub name: String,
    /// Location on disk
    pub path: PathBuf,
    /// Whether this is a `.map` file
    pub is_source_map: bool,
}

/// Output name emitted by more than one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    /// Duplicated output name
    pub name: String,
    /// Labels of every chunk that emitted the name, in iteration order
    pub chunks: Vec<String>,
}

/// Result of scanning a build
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Selected artifacts, ordered by name
    pub artifacts: Vec<Artifact>,
    /// Names emitted by several chunks; the last chunk's entry was kept
    pub collisions: Vec<NameCollision>,
    /// Selected names the build could not locate on disk
    pub unlocated: Vec<String>,
}

/// Whether an emitted file is a script or source map
pub fn is_upload_candidate(name: &str) -> bool {
    name.ends_with(".js") || name.ends_with(".map")
}

/// Pool every chunk's `.js`/`.map` outputs into one artifact set
pub fn discover_artifacts<B: BuildOutput + ?Sized>(build: &B) -> Discovery {
    let mut selected: BTreeMap<String, (PathBuf, Vec<String>)> = BTreeMap::new();
    let mut unlocated: Vec<String> = Vec::new();

    for (index, chunk) in build.chunks().iter().enumerate() {
        let label = chunk.label(index);
        for name in chunk.files.iter().filter(|n| is_upload_candidate(n)) {
            let Some(path) = build.locate(name) else {
                if !unlocated.contains(name) {
                    log::debug!("No location for {} in chunk {}; skipping", name, label);
                    unlocated.push(name.clone());
                }
                continue;
            };

            let entry = selected
                .entry(name.clone())
                .or_insert_with(|| (path.clone(), Vec::new()));
            entry.0 = path;
            entry.1.push(label.clone());
        }
    }

    let mut artifacts = Vec::with_capacity(selected.len());
    let mut collisions = Vec::new();
    for (name, (path, chunks)) in selected {
        if chunks.len() > 1 {
            log::warn!(
                "{} is emitted by {} chunks ({}); using the last one",
                name,
                chunks.len(),
                chunks.join(", ")
            );
            collisions.push(NameCollision {
                name: name.clone(),
                chunks,
            });
        }
        artifacts.push(Artifact {
            is_source_map: name.ends_with(".map"),
            name,
            path,
        });
    }

    Discovery {
        artifacts,
        collisions,
        unlocated,
    }
}
