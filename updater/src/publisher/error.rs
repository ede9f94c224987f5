//! Error types for the publisher module.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for publisher operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while adding a binary to a release repository.
#[derive(Debug)]
pub enum PublishError {
    /// The binary to publish does not exist or cannot be inspected.
    BinaryNotFound { path: PathBuf, source: io::Error },

    /// No repository found at the specified path.
    RepositoryNotFound(PathBuf),

    /// The repository path exists but is not a directory.
    InvalidRepository(String),

    /// A path cannot be used (for example, it has no file name).
    InvalidPath(String),

    /// Failed to create directory.
    CreateDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// The compressed artifact already exists and overwriting was not requested.
    ArtifactExists(PathBuf),

    /// The copied binary does not match the source binary.
    ChecksumMismatch {
        file: PathBuf,
        expected: String,
        actual: String,
    },

    /// Compression failed.
    CompressionFailed { path: PathBuf, source: io::Error },

    /// The release manifest could not be encoded.
    ManifestEncode(String),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::BinaryNotFound { path, source } => {
                write!(f, "the binary '{}' does not exist: {}", path.display(), source)
            }
            PublishError::RepositoryNotFound(path) => {
                write!(f, "the repository '{}' does not exist", path.display())
            }
            PublishError::InvalidRepository(msg) => {
                write!(f, "invalid repository: {}", msg)
            }
            PublishError::InvalidPath(msg) => {
                write!(f, "invalid path: {}", msg)
            }
            PublishError::CreateDirectoryFailed { path, source } => {
                write!(
                    f,
                    "could not create target '{}': {}",
                    path.display(),
                    source
                )
            }
            PublishError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            PublishError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            PublishError::ArtifactExists(path) => {
                write!(f, "target {} already exist", path.display())
            }
            PublishError::ChecksumMismatch {
                file,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "file copy operation did not produce the same checksum for {}: expected {}, got {}",
                    file.display(),
                    expected,
                    actual
                )
            }
            PublishError::CompressionFailed { path, source } => {
                write!(f, "could not compress '{}': {}", path.display(), source)
            }
            PublishError::ManifestEncode(msg) => {
                write!(f, "could not encode release manifest: {}", msg)
            }
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::BinaryNotFound { source, .. } => Some(source),
            PublishError::CreateDirectoryFailed { source, .. } => Some(source),
            PublishError::ReadFailed { source, .. } => Some(source),
            PublishError::WriteFailed { source, .. } => Some(source),
            PublishError::CompressionFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_repository_not_found_display() {
        let err = PublishError::RepositoryNotFound(PathBuf::from("/test/path"));
        assert_eq!(err.to_string(), "the repository '/test/path' does not exist");
    }

    #[test]
    fn test_artifact_exists_display() {
        let err = PublishError::ArtifactExists(PathBuf::from("/repo/1.0.0/linux/amd64/app.bz2"));
        assert!(err.to_string().contains("already exist"));
        assert!(err.to_string().contains("app.bz2"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = PublishError::ChecksumMismatch {
            file: PathBuf::from("app-linux-amd64-1.0.0"),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }

    #[test]
    fn test_error_source_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = PublishError::ReadFailed {
            path: PathBuf::from("/test"),
            source: io_err,
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_none() {
        let err = PublishError::InvalidRepository("not a directory".to_string());
        assert!(err.source().is_none());
    }
}
