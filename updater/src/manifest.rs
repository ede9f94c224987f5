//! Release manifest describing one available binary.
//!
//! A repository publishes one `release.json` per version/OS/architecture:
//!
//! ```json
//! {
//!   "binary": "choria-linux-amd64-0.7.0.bz2",
//!   "hash": "<lowercase hex SHA-256 of the decompressed binary>",
//!   "signature": "<optional>"
//! }
//! ```
//!
//! The fully-qualified location of the artifact is not transmitted; the
//! retrieval capability derives it and stores it in [`ReleaseManifest::binary_uri`].

use serde::{Deserialize, Serialize};

/// Filename of the manifest within a release directory.
pub const MANIFEST_FILENAME: &str = "release.json";

/// Describes an available release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    /// Name of the compressed artifact, relative to the release directory.
    #[serde(rename = "binary")]
    pub binary_path: String,

    /// Full location of the artifact, derived by the retrieval capability.
    #[serde(rename = "uri", default, skip_serializing_if = "Option::is_none")]
    pub binary_uri: Option<String>,

    /// Lowercase hex SHA-256 of the decompressed binary.
    #[serde(rename = "hash")]
    pub sha256: String,

    /// Carried for compatibility; not verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ReleaseManifest {
    /// Create a manifest for an artifact with the given digest.
    pub fn new(binary_path: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            binary_uri: None,
            sha256: sha256.into(),
            signature: None,
        }
    }

    /// Parse a manifest from its JSON representation.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serialize the manifest as published in a repository.
    ///
    /// The derived location is never written out.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let published = Self {
            binary_uri: None,
            ..self.clone()
        };
        serde_json::to_string(&published)
    }
}

/// Directory of a release relative to the repository root.
pub fn release_dir(version: &str, os: &str, arch: &str) -> String {
    format!("{}/{}/{}", version, os, arch)
}
