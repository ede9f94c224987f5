//! Adding a binary to a release repository.
//!
//! Produces the layout the downloaders consume:
//!
//! ```text
//! <root>/<version>/<os>/<arch>/release.json
//! <root>/<version>/<os>/<arch>/<name>-<os>-<arch>-<version>.bz2
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use bzip2::Compression;

use super::{PublishError, PublishResult};
use crate::download::calculate_file_checksum;
use crate::error::UpdateError;
use crate::manifest::{release_dir, ReleaseManifest, MANIFEST_FILENAME};

/// What to publish and where.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// The binary to add to the repository.
    pub binary: PathBuf,

    /// The version this binary represents.
    pub version: String,

    /// Operating system the binary is built for.
    pub os: String,

    /// Architecture the binary is built for.
    pub arch: String,

    /// Root of the repository.
    pub repo: PathBuf,

    /// Overwrite an existing artifact.
    pub force: bool,
}

/// Result of publishing a binary.
#[derive(Debug, Clone)]
pub struct PublishedRelease {
    /// The manifest that was written.
    pub manifest: ReleaseManifest,

    /// Path of `release.json`.
    pub manifest_path: PathBuf,

    /// Path of the compressed artifact.
    pub artifact_path: PathBuf,
}

/// Artifact name for a binary: `<name>-<os>-<arch>-<version>`.
pub fn artifact_name(binary_name: &str, os: &str, arch: &str, version: &str) -> String {
    format!("{}-{}-{}-{}", binary_name, os, arch, version)
}

/// Copy, verify and compress a binary into the repository and write its manifest.
///
/// # Errors
///
/// Fails without writing anything if the binary or repository is missing, or
/// if the artifact already exists and `force` is not set. A copy whose
/// checksum differs from the source is removed before returning.
pub fn publish_binary(options: &PublishOptions) -> PublishResult<PublishedRelease> {
    validate_binary(&options.binary)?;
    validate_repo(&options.repo)?;

    let binary_name = options
        .binary
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PublishError::InvalidPath(format!(
                "{} has no usable file name",
                options.binary.display()
            ))
        })?;

    let name = artifact_name(binary_name, &options.os, &options.arch, &options.version);
    let target_dir = options
        .repo
        .join(release_dir(&options.version, &options.os, &options.arch));
    let copy_path = target_dir.join(&name);
    let compressed_name = format!("{}.bz2", name);
    let artifact_path = target_dir.join(&compressed_name);
    let manifest_path = target_dir.join(MANIFEST_FILENAME);

    if !options.force && artifact_path.exists() {
        return Err(PublishError::ArtifactExists(artifact_path));
    }

    let sha256 = file_sha256(&options.binary)?;

    fs::create_dir_all(&target_dir).map_err(|e| PublishError::CreateDirectoryFailed {
        path: target_dir.clone(),
        source: e,
    })?;

    fs::copy(&options.binary, &copy_path).map_err(|e| PublishError::WriteFailed {
        path: copy_path.clone(),
        source: e,
    })?;

    let copied = file_sha256(&copy_path)?;
    if copied != sha256 {
        let _ = fs::remove_file(&copy_path);
        return Err(PublishError::ChecksumMismatch {
            file: copy_path,
            expected: sha256,
            actual: copied,
        });
    }

    compress(&copy_path, &artifact_path)?;
    let _ = fs::remove_file(&copy_path);

    let manifest = ReleaseManifest::new(compressed_name, sha256);
    let json = manifest
        .to_json()
        .map_err(|e| PublishError::ManifestEncode(e.to_string()))?;
    fs::write(&manifest_path, json).map_err(|e| PublishError::WriteFailed {
        path: manifest_path.clone(),
        source: e,
    })?;

    tracing::info!(
        artifact = %artifact_path.display(),
        sha256 = %manifest.sha256,
        "published release"
    );

    Ok(PublishedRelease {
        manifest,
        manifest_path,
        artifact_path,
    })
}

fn validate_binary(binary: &Path) -> PublishResult<()> {
    let metadata = fs::metadata(binary).map_err(|e| PublishError::BinaryNotFound {
        path: binary.to_path_buf(),
        source: e,
    })?;

    if !metadata.is_file() {
        return Err(PublishError::InvalidPath(format!(
            "the binary '{}' is not a file",
            binary.display()
        )));
    }
    Ok(())
}

fn validate_repo(repo: &Path) -> PublishResult<()> {
    let metadata =
        fs::metadata(repo).map_err(|_| PublishError::RepositoryNotFound(repo.to_path_buf()))?;

    if !metadata.is_dir() {
        return Err(PublishError::InvalidRepository(format!(
            "the repository '{}' is not a directory",
            repo.display()
        )));
    }
    Ok(())
}

fn file_sha256(path: &Path) -> PublishResult<String> {
    calculate_file_checksum(path).map_err(|e| match e {
        UpdateError::ReadFailed { path, source } => PublishError::ReadFailed { path, source },
        other => PublishError::ReadFailed {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, other.to_string()),
        },
    })
}

/// Write a bzip2-compressed copy of `source` to `dest`, replacing `dest`.
fn compress(source: &Path, dest: &Path) -> PublishResult<()> {
    let input = File::open(source).map_err(|e| PublishError::ReadFailed {
        path: source.to_path_buf(),
        source: e,
    })?;
    let output = File::create(dest).map_err(|e| PublishError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut encoder = BzEncoder::new(BufWriter::new(output), Compression::best());
    let result = io::copy(&mut BufReader::new(input), &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush());

    if let Err(e) = result {
        let _ = fs::remove_file(dest);
        return Err(PublishError::CompressionFailed {
            path: source.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}
