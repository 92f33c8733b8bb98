//! Public (server-visible) names for uploaded artifacts.
//!
//! Every name is prefixed with `~`, which the tracking service treats as
//! "any origin" when matching stack-trace URLs against uploaded files.

use std::collections::BTreeMap;

/// Base used when neither configuration nor build supplies one
const ROOT: &str = "/";

/// Computes the public name of each artifact
#[derive(Debug, Clone)]
pub struct PublicPathResolver<'a> {
    overrides: &'a BTreeMap<String, String>,
    default_base: String,
}

impl<'a> PublicPathResolver<'a> {
    /// Create a resolver
    ///
    /// The default base is the configured default, else the build's own
    /// public path, else `/`.
    pub fn new(
        overrides: &'a BTreeMap<String, String>,
        configured_default: Option<&str>,
        build_public_path: Option<&str>,
    ) -> Self {
        let default_base = configured_default
            .or(build_public_path)
            .unwrap_or(ROOT)
            .to_string();
        Self {
            overrides,
            default_base,
        }
    }

    /// Base path that applies to an artifact
    ///
    /// A blank override counts as no override.
    pub fn base_for(&self, name: &str) -> &str {
        self.overrides
            .get(name)
            .map(String::as_str)
            .filter(|base| !base.trim().is_empty())
            .unwrap_or(&self.default_base)
    }

    /// Public name of an artifact, e.g. `~/static/app.js`
    pub fn resolve(&self, name: &str) -> String {
        join_public_name(self.base_for(name), name)
    }
}

/// Link field value pointing a script at its sibling map
///
/// Source maps themselves carry no link.
pub fn sourcemap_link(name: &str) -> Option<String> {
    if name.ends_with(".map") {
        return None;
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    Some(format!("Sourcemap:{}.map", file_name))
}

fn join_public_name(base: &str, name: &str) -> String {
    let base = base_path(base);
    let name = name.trim_start_matches("./").trim_start_matches('/');

    let mut joined = String::from("~/");
    let base = base.trim_matches('/');
    if !base.is_empty() {
        joined.push_str(base);
        joined.push('/');
    }
    joined.push_str(name);
    joined
}

/// Reduce a configured base to its path component
///
/// Absolute and protocol-relative URLs keep only their path; webpack's
/// `auto` public path means "relative to the script" and maps to the root.
fn base_path(base: &str) -> String {
    let base = base.trim().trim_start_matches('~');
    if base.is_empty() || base == "auto" {
        return ROOT.to_string();
    }

    let candidate = if base.starts_with("//") {
        format!("https:{}", base)
    } else {
        base.to_string()
    };
    match url::Url::parse(&candidate) {
        Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
        _ => base.to_string(),
    }
}
