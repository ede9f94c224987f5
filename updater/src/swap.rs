//! Backup and rename-based replacement of the live target.
//!
//! Files involved, all next to the target:
//!
//! | Path              | Lifetime                                          |
//! |-------------------|---------------------------------------------------|
//! | `<target>.new`    | downloaded binary, consumed by the swap           |
//! | `<target>.old`    | live binary during the swap, removed afterwards   |
//! | `<target>.backup` | copy of the live binary, kept for manual rollback |
//!
//! Renames are only atomic within one filesystem, so all of these paths share
//! the target's directory.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::sibling_path;
use crate::error::{UpdateError, UpdateResult};

/// Copy the live target to `<target>.backup`, preserving its mode.
///
/// Any previous backup is replaced. Returns the backup path.
pub fn backup_target(target: &Path) -> UpdateResult<PathBuf> {
    let backup = sibling_path(target, "backup");

    let permissions = fs::metadata(target)
        .map_err(|e| UpdateError::ReadFailed {
            path: target.to_path_buf(),
            source: e,
        })?
        .permissions();

    // Best effort: a stale backup that cannot be removed is truncated below.
    let _ = fs::remove_file(&backup);

    let mut input = File::open(target).map_err(|e| UpdateError::ReadFailed {
        path: target.to_path_buf(),
        source: e,
    })?;

    let mut output = create_with_mode(&backup, &permissions).map_err(|e| {
        UpdateError::WriteFailed {
            path: backup.clone(),
            source: e,
        }
    })?;

    io::copy(&mut input, &mut output)
        .and_then(|_| output.sync_all())
        .map_err(|e| UpdateError::WriteFailed {
            path: backup.clone(),
            source: e,
        })?;
    drop(output);

    fs::set_permissions(&backup, permissions).map_err(|e| UpdateError::Permissions {
        path: backup.clone(),
        source: e,
    })?;

    tracing::debug!(backup = %backup.display(), "backed up target");
    Ok(backup)
}

#[cfg(unix)]
fn create_with_mode(path: &Path, permissions: &fs::Permissions) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    // Owner write is needed to fill the file; the exact mode is set afterwards.
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(permissions.mode() | 0o200)
        .open(path)
}

#[cfg(not(unix))]
fn create_with_mode(path: &Path, _permissions: &fs::Permissions) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Removes `<target>.old` when dropped.
struct OldFileGuard {
    path: PathBuf,
}

impl Drop for OldFileGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::debug!(path = %self.path.display(), error = %e, "could not remove old binary");
            }
        }
    }
}

/// Replace `target` with `new_path`, restoring from `backup` on failure.
///
/// 1. `target` is renamed to `<target>.old`. If this fails nothing has
///    changed and the rename error is returned as is.
/// 2. `new_path` is renamed onto `target`.
/// 3. If that fails, `backup` is renamed onto `target`. The result is an
///    [`UpdateError::Swap`] whose rollback field is `None` when the restore
///    worked, and holds the restore error otherwise.
///
/// `<target>.old` is removed on every exit once the first rename succeeded.
/// Removal is best-effort and its failure is not reported.
pub fn swap_new(new_path: &Path, backup: &Path, target: &Path) -> UpdateResult<()> {
    let old_path = sibling_path(target, "old");

    fs::rename(target, &old_path).map_err(|e| UpdateError::Rename {
        from: target.to_path_buf(),
        to: old_path.clone(),
        source: e,
    })?;
    let _old_guard = OldFileGuard { path: old_path };

    let primary = match fs::rename(new_path, target) {
        Ok(()) => {
            tracing::debug!(target = %target.display(), "swapped in new binary");
            return Ok(());
        }
        Err(e) => UpdateError::Rename {
            from: new_path.to_path_buf(),
            to: target.to_path_buf(),
            source: e,
        },
    };

    tracing::warn!(error = %primary, "swap failed, restoring backup");

    match fs::rename(backup, target) {
        Ok(()) => {
            tracing::info!(target = %target.display(), "restored target from backup");
            Err(UpdateError::Swap {
                primary: Box::new(primary),
                rollback: None,
            })
        }
        Err(e) => {
            let rollback = UpdateError::Rename {
                from: backup.to_path_buf(),
                to: target.to_path_buf(),
                source: e,
            };
            tracing::error!(error = %rollback, "rollback failed, target state unknown");
            Err(UpdateError::Swap {
                primary: Box::new(primary),
                rollback: Some(Box::new(rollback)),
            })
        }
    }
}
