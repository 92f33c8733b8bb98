//! Response records returned by the release API.

use serde::{Deserialize, Deserializer, Serialize};

/// Release as reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    /// Release version
    #[serde(default)]
    pub version: String,
    /// Creation timestamp
    #[serde(default)]
    pub date_created: Option<String>,
    /// Finalize timestamp, unset until finalized
    #[serde(default)]
    pub date_released: Option<String>,
    /// Release URL, when the service returns one
    #[serde(default)]
    pub url: Option<String>,
}

impl ReleaseRecord {
    /// Record for a version when the API returned an empty body
    pub fn for_version(version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..Default::default()
        }
    }
}

/// Uploaded release file as reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Server-side file id
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Public name the file is stored under
    #[serde(default)]
    pub name: String,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Content checksum
    #[serde(default)]
    pub sha1: Option<String>,
}

/// Accept ids sent either as `"42"` or `42`
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => String::new(),
    })
}
