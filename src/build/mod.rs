//! Build output model consumed after a bundle has been emitted.
//!
//! The host build tool is represented by the [`BuildOutput`] trait. The
//! shipped implementation, [`BuildManifest`], reads a stats-like JSON file so
//! any bundler that can dump its chunk list and asset locations can drive an
//! upload.

mod discovery;
mod public_path;

pub use discovery::{Artifact, Discovery, NameCollision, discover_artifacts, is_upload_candidate};
pub use public_path::{PublicPathResolver, sourcemap_link};

use crate::error::{CliError, ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One compilation unit and the files it emitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk identifier, used in diagnostics only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Emitted output file names
    #[serde(default)]
    pub files: Vec<String>,
}

impl Chunk {
    /// Label for log and warning messages
    pub fn label(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("#{}", index))
    }
}

/// Read-only view of a completed build
pub trait BuildOutput {
    /// Compilation units in the build tool's iteration order
    fn chunks(&self) -> &[Chunk];

    /// On-disk location of an emitted file
    fn locate(&self, name: &str) -> Option<PathBuf>;

    /// Public base path configured in the build tool
    fn public_path(&self) -> Option<&str>;
}

/// Emitted asset entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLocation {
    /// Where the asset was written
    pub exists_at: PathBuf,
}

/// Build description loaded from a JSON manifest
///
/// ```json
/// {
///   "publicPath": "/static/",
///   "outputPath": "dist",
///   "chunks": [{ "id": "main", "files": ["app.js", "app.js.map"] }],
///   "assets": { "app.js": { "existsAt": "dist/app.js" } }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildManifest {
    /// Public base path configured in the bundler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
    /// Directory holding emitted files without an explicit asset entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Compilation units in emit order
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    /// Explicit asset locations keyed by output name
    #[serde(default)]
    pub assets: BTreeMap<String, AssetLocation>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl BuildManifest {
    /// Load a manifest from disk; relative paths resolve against its directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReleaseError::Cli(CliError::InvalidArguments {
                reason: format!("Cannot read build manifest {}: {}", path.display(), e),
            })
        })?;
        let mut manifest: Self = serde_json::from_str(&content)?;
        manifest.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(manifest)
    }

    /// Parse a manifest from JSON text, resolving relative paths against `base_dir`
    pub fn from_json_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut manifest: Self = serde_json::from_str(content)?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl BuildOutput for BuildManifest {
    fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        if let Some(asset) = self.assets.get(name) {
            return Some(self.resolve(&asset.exists_at));
        }
        self.output_path
            .as_ref()
            .map(|dir| self.resolve(dir).join(name))
    }

    fn public_path(&self) -> Option<&str> {
        self.public_path.as_deref()
    }
}
