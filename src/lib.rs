//! # sourcemap_release
//!
//! Upload a build's scripts and source maps to an error-tracking release.
//!
//! After a bundle has been emitted, one call registers a release, uploads
//! every `.js` and `.map` output under the path it is served from, and
//! finalizes the release. Failed uploads are reported per file and never sink
//! the release; a failed create or finalize is reported as fatal.
//!
//! ## Features
//!
//! - **Three-phase workflow**: create, concurrent upload, finalize
//! - **Fault isolation**: one bad artifact does not stop its siblings
//! - **Public path mapping**: per-file overrides over a default base path
//! - **Source map linking**: scripts carry a `Sourcemap:` link to their map
//! - **Retries**: transport errors and 5xx responses retried with a fixed delay
//!
//! ## Usage
//!
//! ```bash
//! sourcemap_release plan --manifest dist/stats.json
//! sourcemap_release upload --manifest dist/stats.json --release-version 2024.05.1
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;

// Re-export main types for public API
pub use build::{Artifact, BuildManifest, BuildOutput, Chunk};
pub use cli::Args;
pub use client::{ReleaseApi, ReleaseClient, ReleaseRecord, UploadRecord};
pub use config::{FinalizeEndpoint, ReleaseMetadata, RetryPolicy, UploadConfig};
pub use error::{ClientError, ReleaseError, Result};
pub use orchestrator::{
    BuildDiagnostics, BuildOutcome, FatalError, UploadOrchestrator, UploadOutcome, UploadPhase,
    UploadPlan, UploadReport,
};
