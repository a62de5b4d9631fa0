use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::constants::BACKUP_SUFFIX;
use crate::core::UpdateError;

/// Manages the `<exe>.old` backup that exists while the executable is swapped.
///
/// The backup is created by **renaming** the running executable rather than
/// copying it, so it costs nothing and works even for large binaries. Between
/// [`create_backup`](Self::create_backup) and [`cleanup_backup`](Self::cleanup_backup)
/// the original path may be empty; that window is the install critical section.
///
/// # Crash States
///
/// | `<exe>` | `<exe>.old` | Meaning |
/// |---|---|---|
/// | present | absent | normal |
/// | absent | present | install interrupted after the rename, restore `.old` |
/// | present | present | install finished but cleanup failed, `.old` is stale |
///
/// [`recover_interrupted`](Self::recover_interrupted) resolves the last two.
///
/// # Examples
///
/// ```rust,no_run
/// use assistd::upgrade::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), assistd::core::UpdateError> {
/// let backup = BackupManager::new(PathBuf::from("/home/me/.local/bin/assistd"));
///
/// backup.create_backup().await?;
/// // ... copy the new binary into place ...
/// let copy_failed = false;
/// if copy_failed {
///     backup.restore_backup().await?;
/// } else {
///     backup.cleanup_backup().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
}

/// What [`BackupManager::recover_interrupted`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// No backup was present.
    Clean,
    /// The original was missing and the backup was renamed back.
    Restored,
    /// Both existed; the stale backup was removed.
    RemovedStale,
}

impl BackupManager {
    /// Create a manager for the executable at `executable_path`.
    ///
    /// The backup path is the executable path with `.old` appended to the
    /// file name, in the same directory (and therefore the same filesystem,
    /// which keeps the rename atomic).
    pub fn new(executable_path: PathBuf) -> Self {
        let mut backup_path = executable_path.clone();
        backup_path.set_file_name(format!(
            "{}{}",
            executable_path.file_name().unwrap_or_default().to_string_lossy(),
            BACKUP_SUFFIX
        ));

        Self {
            original_path: executable_path,
            backup_path,
        }
    }

    /// Move the executable aside to `<exe>.old`.
    ///
    /// A leftover backup from an earlier run is removed first. After this
    /// returns `Ok`, the original path is empty.
    pub async fn create_backup(&self) -> Result<(), UpdateError> {
        if fs::try_exists(&self.backup_path).await.unwrap_or(false) {
            debug!(path = %self.backup_path.display(), "Removing old backup");
            fs::remove_file(&self.backup_path)
                .await
                .map_err(|e| UpdateError::install("remove stale backup", &self.backup_path, e))?;
        }

        info!(
            from = %self.original_path.display(),
            to = %self.backup_path.display(),
            "Moving current binary to backup"
        );
        fs::rename(&self.original_path, &self.backup_path)
            .await
            .map_err(|e| UpdateError::install("back up", &self.original_path, e))
    }

    /// Put the backup back at the original path.
    ///
    /// Whatever is at the original path (typically a partial copy) is removed
    /// first so the rename also works on platforms that refuse to rename over
    /// an existing file.
    pub async fn restore_backup(&self) -> Result<(), UpdateError> {
        warn!(path = %self.backup_path.display(), "Restoring from backup");

        match fs::remove_file(&self.original_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(UpdateError::install("remove partial binary", &self.original_path, e));
            }
        }

        fs::rename(&self.backup_path, &self.original_path)
            .await
            .map_err(|e| UpdateError::install("restore backup", &self.backup_path, e))?;

        info!("Successfully restored from backup");
        Ok(())
    }

    /// Remove the backup if it exists.
    pub async fn cleanup_backup(&self) -> Result<(), UpdateError> {
        match fs::remove_file(&self.backup_path).await {
            Ok(()) => {
                debug!(path = %self.backup_path.display(), "Cleaned up backup");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UpdateError::install("remove backup", &self.backup_path, e)),
        }
    }

    /// Repair the state left by an install that was interrupted mid-swap.
    pub async fn recover_interrupted(&self) -> Result<Recovery, UpdateError> {
        if !self.backup_exists() {
            return Ok(Recovery::Clean);
        }

        if self.original_path.exists() {
            self.cleanup_backup().await?;
            return Ok(Recovery::RemovedStale);
        }

        warn!(
            path = %self.original_path.display(),
            "Executable missing with backup present; previous install was interrupted"
        );
        fs::rename(&self.backup_path, &self.original_path)
            .await
            .map_err(|e| UpdateError::install("restore backup", &self.backup_path, e))?;
        Ok(Recovery::Restored)
    }

    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }
}
