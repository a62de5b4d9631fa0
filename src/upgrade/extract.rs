//! Safe unpacking of release archives.
//!
//! Archives come from the network and are treated as hostile even after the
//! checksum matches. Every entry path is cleaned and rejected if it is absolute
//! or climbs out of the destination, then the joined path is checked again
//! against the destination prefix. Regular files are written with normalized
//! permissions and copied through a size cap; links, devices and other entry
//! types are skipped.

use flate2::read::GzDecoder;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

use crate::constants::MAX_EXTRACT_FILE_SIZE;
use crate::core::UpdateError;
use crate::utils::fs::{clean_path, escapes_base};
use crate::utils::platform::binary_file_name;

const DIR_MODE: u32 = 0o755;
const EXEC_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Unpacks `.tar.gz` archives with path and size limits.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveExtractor {
    max_file_size: u64,
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new(MAX_EXTRACT_FILE_SIZE)
    }
}

impl ArchiveExtractor {
    /// Extractor that truncates each file at `max_file_size` bytes.
    pub const fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
        }
    }

    /// Unpack `archive_path` into `dest_dir`.
    ///
    /// Blocking; async callers should run it on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::PathTraversal`] on the first entry that would
    /// land outside `dest_dir`. Files extracted before that entry are left in
    /// place for the caller to discard with the scratch directory.
    pub fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<(), UpdateError> {
        info!(
            archive = %archive_path.display(),
            dest = %dest_dir.display(),
            "Extracting archive"
        );

        let file = File::open(archive_path).map_err(|e| UpdateError::fs("opening", archive_path, e))?;
        let mut archive = Archive::new(GzDecoder::new(file));
        let entries = archive.entries().map_err(|e| decode_error(archive_path, &e))?;

        let mut extracted = 0usize;
        for entry in entries {
            let mut entry = entry.map_err(|e| decode_error(archive_path, &e))?;
            let raw_path = entry.path().map_err(|e| decode_error(archive_path, &e))?.into_owned();
            let target = safe_join(dest_dir, &raw_path)?;

            match entry.header().entry_type() {
                EntryType::Directory => {
                    create_dir(&target)?;
                }
                EntryType::Regular | EntryType::Continuous => {
                    let executable = entry.header().mode().map(|m| m & 0o111 != 0).unwrap_or(false);
                    let written = self.write_file(&mut entry, &target, executable)?;
                    debug!(path = %target.display(), bytes = written, executable, "Extracted file");
                    extracted += 1;
                }
                other => {
                    debug!(entry = %raw_path.display(), kind = ?other, "Skipping non-regular entry");
                }
            }
        }

        info!(files = extracted, "Extraction complete");
        Ok(())
    }

    fn write_file(&self, entry: &mut impl Read, target: &Path, executable: bool) -> Result<u64, UpdateError> {
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }

        let mode = if executable {
            EXEC_MODE
        } else {
            FILE_MODE
        };
        let mut file = open_for_write(target, mode)?;
        let written = io::copy(&mut entry.take(self.max_file_size), &mut file)
            .map_err(|e| UpdateError::fs("writing", target, e))?;

        if written == self.max_file_size {
            warn!(
                path = %target.display(),
                limit = self.max_file_size,
                "Archive entry reached the size limit and may be truncated"
            );
        }
        set_mode(target, mode)?;
        Ok(written)
    }
}

/// Locate the expected executable inside an extraction directory.
///
/// # Errors
///
/// Returns [`UpdateError::BinaryMissing`] if no regular file with the
/// platform binary name exists at the top of `dest_dir`.
pub fn locate_binary(dest_dir: &Path, binary_name: &str) -> Result<PathBuf, UpdateError> {
    let file_name = binary_file_name(binary_name);
    let candidate = dest_dir.join(&file_name);

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(UpdateError::BinaryMissing {
            binary: file_name,
            dir: dest_dir.display().to_string(),
        })
    }
}

/// Resolve an archive entry path under `dest_dir`, rejecting escapes.
fn safe_join(dest_dir: &Path, entry_path: &Path) -> Result<PathBuf, UpdateError> {
    let cleaned = clean_path(entry_path);
    let traversal = || {
        warn!(entry = %entry_path.display(), "Rejecting archive entry outside destination");
        UpdateError::PathTraversal {
            entry: entry_path.display().to_string(),
        }
    };

    if escapes_base(&cleaned) {
        return Err(traversal());
    }

    let joined = dest_dir.join(&cleaned);
    if !joined.starts_with(dest_dir) {
        return Err(traversal());
    }
    Ok(joined)
}

fn decode_error(archive_path: &Path, err: &io::Error) -> UpdateError {
    UpdateError::Decode {
        what: format!("archive {}", archive_path.display()),
        reason: err.to_string(),
    }
}

fn create_dir(path: &Path) -> Result<(), UpdateError> {
    fs::create_dir_all(path).map_err(|e| UpdateError::fs("creating directory", path, e))?;
    set_mode(path, DIR_MODE)
}

#[cfg(unix)]
fn open_for_write(path: &Path, mode: u32) -> Result<File, UpdateError> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(|e| UpdateError::fs("creating", path, e))
}

#[cfg(not(unix))]
fn open_for_write(path: &Path, _mode: u32) -> Result<File, UpdateError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| UpdateError::fs("creating", path, e))
}

// The open mode is filtered by the umask and ignored for existing files
#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), UpdateError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| UpdateError::fs("setting permissions on", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), UpdateError> {
    Ok(())
}
