//! Atomic replacement of the running executable.
//!
//! The swap is the one critical section of an upgrade:
//!
//! ```text
//! 1. resolve <exe> (symlinks followed)
//! 2. chmod +x <new>
//! 3. rename <exe> -> <exe>.old          point of no return for <exe>
//! 4. copy <new> -> <exe>, chmod +x      on failure: rename <exe>.old -> <exe>
//! 5. remove <exe>.old                   best-effort
//! 6. restart (unless disabled)
//! ```
//!
//! Step 4 copies rather than renames so the scratch directory may live on a
//! different filesystem than the executable. At every observable point either
//! `<exe>` or `<exe>.old` holds a runnable binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::upgrade::backup::BackupManager;
use crate::upgrade::restart::{ExecRestarter, Restarter, current_invocation};
use crate::utils::platform::current_executable;

/// Path prefixes owned by system package managers.
const SYSTEM_MANAGED_PREFIXES: &[&str] = &[
    "/usr/bin/",
    "/usr/sbin/",
    "/usr/local/bin/",
    "/usr/local/Cellar/",
    "/opt/",
    "/nix/store/",
    "/snap/",
];

/// Installs a new binary over a target executable.
pub struct Installer {
    target: PathBuf,
    backup: BackupManager,
    restarter: Arc<dyn Restarter>,
}

impl Installer {
    /// Installer for an explicit target path.
    pub fn new(target: PathBuf) -> Self {
        Self {
            backup: BackupManager::new(target.clone()),
            target,
            restarter: Arc::new(ExecRestarter),
        }
    }

    /// Installer for the currently running executable.
    pub fn for_current_exe() -> Result<Self, UpdateError> {
        let target = current_executable().map_err(|e| UpdateError::InstallIo {
            operation: "resolve".to_string(),
            path: "current executable".to_string(),
            source: std::io::Error::other(format!("{e:#}")),
        })?;
        Ok(Self::new(target))
    }

    #[must_use]
    pub fn with_restarter(mut self, restarter: Arc<dyn Restarter>) -> Self {
        self.restarter = restarter;
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn backup(&self) -> &BackupManager {
        &self.backup
    }

    /// Whether the target lives under a package-manager owned prefix.
    pub fn is_system_managed(&self) -> bool {
        is_system_managed_path(&self.target)
    }

    /// Swap in `new_binary` and, unless `no_restart`, restart into it.
    ///
    /// On a failed swap the original binary is restored and the swap error is
    /// returned. A restart failure leaves the new binary installed.
    pub async fn apply(&self, new_binary: &Path, no_restart: bool) -> Result<(), UpdateError> {
        self.install(new_binary).await?;
        if no_restart {
            debug!("Restart disabled");
            return Ok(());
        }
        self.restart()
    }

    /// Steps 2-5 of the swap, without restarting.
    pub async fn install(&self, new_binary: &Path) -> Result<(), UpdateError> {
        info!(
            source = %new_binary.display(),
            target = %self.target.display(),
            "Installing new binary"
        );

        make_executable(new_binary).await?;
        self.backup.create_backup().await?;

        if let Err(err) = self.copy_into_place(new_binary).await {
            warn!(error = %err, "Install failed, rolling back");
            if let Err(restore_err) = self.backup.restore_backup().await {
                warn!(
                    error = %restore_err,
                    backup = %self.backup.backup_path().display(),
                    "Rollback failed; previous binary remains at backup path"
                );
            }
            return Err(err);
        }

        if let Err(e) = self.backup.cleanup_backup().await {
            warn!(error = %e, "Failed to remove backup");
        }

        info!(target = %self.target.display(), "New binary installed");
        Ok(())
    }

    /// Replace the process image with the installed binary.
    pub fn restart(&self) -> Result<(), UpdateError> {
        let (args, env) = current_invocation();
        self.restarter.restart(&self.target, &args, &env)
    }

    async fn copy_into_place(&self, new_binary: &Path) -> Result<(), UpdateError> {
        fs::copy(new_binary, &self.target)
            .await
            .map_err(|e| UpdateError::install("copy new binary to", &self.target, e))?;
        make_executable(&self.target).await
    }
}

/// Whether `path` lives under a package-manager owned prefix.
#[must_use]
pub fn is_system_managed_path(path: &Path) -> bool {
    let path = path.to_string_lossy();
    SYSTEM_MANAGED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Whether the running executable was installed by a package manager.
pub fn is_system_managed() -> bool {
    current_executable().map(|p| is_system_managed_path(&p)).unwrap_or(false)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), UpdateError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| UpdateError::install("make executable", path, e))
}

#[cfg(not(unix))]
async fn make_executable(path: &Path) -> Result<(), UpdateError> {
    // Executability is by extension; only check the file is there
    fs::metadata(path)
        .await
        .map(|_| ())
        .map_err(|e| UpdateError::install("make executable", path, e))
}
