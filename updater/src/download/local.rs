//! Release downloader for repositories on a local or mounted filesystem.
//!
//! The source repo is a directory path, optionally written as a `file://`
//! URL. The layout is the same one served over HTTP.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::stage::{install_decompressed, target_permissions};
use super::Downloader;
use crate::config::Config;
use crate::error::{UpdateError, UpdateResult};
use crate::manifest::{ReleaseManifest, MANIFEST_FILENAME};

const FILE_SCHEME: &str = "file://";

/// Reads releases from a directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDownloader;

impl LocalDownloader {
    /// Create a new local downloader.
    pub fn new() -> Self {
        Self
    }
}

fn to_path(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix(FILE_SCHEME).unwrap_or(location))
}

impl Downloader for LocalDownloader {
    fn configure(&self, config: &Config) -> UpdateResult<()> {
        let root = to_path(config.source_repo());
        if !root.is_dir() {
            return Err(UpdateError::InvalidConfig(format!(
                "source repo {} is not a directory",
                root.display()
            )));
        }
        Ok(())
    }

    fn fetch_manifest(&self, config: &Config) -> UpdateResult<ReleaseManifest> {
        let location = config.release_location();
        let manifest_path = to_path(&location).join(MANIFEST_FILENAME);

        tracing::debug!(path = %manifest_path.display(), "reading release manifest");

        let body = fs::read(&manifest_path).map_err(|e| UpdateError::ReadFailed {
            path: manifest_path.clone(),
            source: e,
        })?;

        let mut manifest =
            ReleaseManifest::from_json(&body).map_err(|e| UpdateError::ManifestParse {
                location: manifest_path.display().to_string(),
                reason: e.to_string(),
            })?;

        if manifest.binary_path.is_empty() || Path::new(&manifest.binary_path).is_absolute() {
            return Err(UpdateError::InvalidBinaryLocation(format!(
                "{:?} is not a relative artifact name",
                manifest.binary_path
            )));
        }

        manifest.binary_uri = Some(format!("{}/{}", location, manifest.binary_path));
        Ok(manifest)
    }

    fn fetch_binary(
        &self,
        config: &Config,
        manifest: &ReleaseManifest,
        dest: &Path,
    ) -> UpdateResult<()> {
        let permissions = target_permissions(config.target_file())?;

        let location = manifest.binary_uri.as_deref().ok_or_else(|| {
            UpdateError::InvalidBinaryLocation(format!(
                "manifest for {} has no location",
                manifest.binary_path
            ))
        })?;
        let source = to_path(location);

        config
            .logger()
            .log(&format!("Fetching {}", source.display()));

        let file = File::open(&source).map_err(|e| UpdateError::ReadFailed {
            path: source.clone(),
            source: e,
        })?;
        let written = install_decompressed(BufReader::new(file), location, dest, permissions)?;

        config.logger().log(&format!(
            "Fetched {} bytes from {}",
            written,
            source.display()
        ));

        Ok(())
    }
}
