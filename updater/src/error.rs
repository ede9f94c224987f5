//! Error types for the updater.
//!
//! Low-level variants describe a single failed operation (an HTTP request, a
//! file read, a rename). Stage variants wrap them with the step of the update
//! that failed, so the message a caller logs says where the attempt stopped.
//!
//! Only [`UpdateError::Swap`] can carry a second error: the failure hit while
//! restoring the target from its backup. Use [`rollback_error`] on every error
//! returned by [`Updater::apply`](crate::Updater::apply) to detect it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for updater operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while checking for or applying an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A required setting is missing or a setting is unusable.
    #[error("invalid updater configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request could not be completed.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// Server answered with a non-success status.
    #[error("could not fetch {url}: {status}")]
    HttpStatus { url: String, status: String },

    /// Release manifest could not be decoded.
    #[error("could not parse release manifest {location}: {reason}")]
    ManifestParse { location: String, reason: String },

    /// Artifact location derived from the manifest is not a valid location.
    #[error("could not construct full path to the binary: {0}")]
    InvalidBinaryLocation(String),

    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to decompress the downloaded artifact.
    #[error("could not decompress {location}: {source}")]
    Decompress {
        location: String,
        #[source]
        source: io::Error,
    },

    /// Failed to apply the permission mode of the target to another file.
    #[error("could not set file mode on {}: {source}", path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A rename failed.
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest for the requested release could not be obtained.
    #[error("release {version} not found: {source}")]
    ReleaseNotFound {
        version: String,
        #[source]
        source: Box<UpdateError>,
    },

    /// The candidate binary could not be downloaded into place.
    #[error("download failed: {0}")]
    Download(#[source] Box<UpdateError>),

    /// The downloaded binary does not match the manifest digest.
    #[error("downloaded file had an invalid checksum: expected {expected}, got {actual}")]
    InvalidChecksum { expected: String, actual: String },

    /// The live target could not be copied to its backup.
    #[error("could not create backup: {0}")]
    Backup(#[source] Box<UpdateError>),

    /// Moving the new binary onto the target failed.
    ///
    /// `rollback` is `None` when the target was restored from the backup and
    /// `Some` when the restore failed as well.
    #[error("{}", swap_message(primary, rollback.as_deref()))]
    Swap {
        primary: Box<UpdateError>,
        rollback: Option<Box<UpdateError>>,
    },
}

fn swap_message(primary: &UpdateError, rollback: Option<&UpdateError>) -> String {
    match rollback {
        Some(rollback) => format!("{} (rollback failed: {})", primary, rollback),
        None => primary.to_string(),
    }
}

impl UpdateError {
    /// The error hit while rolling back a failed swap, if any.
    ///
    /// Returns `None` for every error other than a swap failure whose
    /// rollback also failed, including a swap failure that was rolled back
    /// successfully.
    pub fn rollback_error(&self) -> Option<&UpdateError> {
        match self {
            Self::Swap {
                rollback: Some(rollback),
                ..
            } => Some(rollback),
            _ => None,
        }
    }

    /// Whether the target is in an unknown state and needs an operator.
    pub fn requires_intervention(&self) -> bool {
        self.rollback_error().is_some()
    }
}

/// Extract the rollback failure from an error returned by `apply`.
///
/// Applications should call this on every error returned by
/// [`Updater::apply`](crate::Updater::apply). `None` means the target is
/// either untouched or was restored; `Some` means the restore failed and the
/// target may be missing.
pub fn rollback_error(err: &UpdateError) -> Option<&UpdateError> {
    err.rollback_error()
}
