//! Staging of downloaded artifacts shared by all downloaders.
//!
//! The decompressed binary is written to `<dest>.part`, renamed onto `dest`
//! once complete, and given the permission mode of the live target.

use std::fs::{self, File, Permissions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;

use crate::config::sibling_path;
use crate::error::{UpdateError, UpdateResult};

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Permissions of the file being updated.
pub(super) fn target_permissions(target: &Path) -> UpdateResult<Permissions> {
    fs::metadata(target)
        .map(|m| m.permissions())
        .map_err(|e| UpdateError::ReadFailed {
            path: target.to_path_buf(),
            source: e,
        })
}

/// Decompress a bzip2 stream into `dest` and apply `permissions` to it.
///
/// Returns the number of decompressed bytes written. On failure the partial
/// file is removed and `dest` is left as it was.
pub(super) fn install_decompressed<R: Read>(
    compressed: R,
    location: &str,
    dest: &Path,
    permissions: Permissions,
) -> UpdateResult<u64> {
    let staged = sibling_path(dest, "part");

    let result = write_decompressed(compressed, location, &staged);
    let written = match result {
        Ok(written) => written,
        Err(e) => {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&staged, dest) {
        let _ = fs::remove_file(&staged);
        return Err(UpdateError::Rename {
            from: staged,
            to: dest.to_path_buf(),
            source: e,
        });
    }

    fs::set_permissions(dest, permissions).map_err(|e| UpdateError::Permissions {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(written)
}

fn write_decompressed<R: Read>(compressed: R, location: &str, staged: &Path) -> UpdateResult<u64> {
    let file = File::create(staged).map_err(|e| UpdateError::WriteFailed {
        path: staged.to_path_buf(),
        source: e,
    })?;

    let mut decoder = BzDecoder::new(compressed);
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| UpdateError::Decompress {
                location: location.to_string(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| UpdateError::WriteFailed {
                path: staged.to_path_buf(),
                source: e,
            })?;

        written += bytes_read as u64;
    }

    let file = writer.into_inner().map_err(|e| UpdateError::WriteFailed {
        path: staged.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|e| UpdateError::WriteFailed {
        path: staged.to_path_buf(),
        source: e,
    })?;

    Ok(written)
}
