use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::constants::USER_AGENT;
use crate::core::UpdateError;
use crate::upgrade::backup::Recovery;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::download::Downloader;
use crate::upgrade::extract::{ArchiveExtractor, locate_binary};
use crate::upgrade::installer::Installer;
use crate::upgrade::release::Channel;
use crate::upgrade::resolver::{ReleaseResolver, UpdateInfo};
use crate::upgrade::restart::{ExecRestarter, Restarter};
use crate::upgrade::verification::ChecksumVerifier;
use crate::utils::progress::ProgressBar;

/// A verified, extracted update waiting to be installed.
///
/// Owns the scratch directory holding the archive and the extracted binary.
/// Dropping it removes the directory, so an update abandoned at any point
/// before [`SelfUpdater::apply`] leaves nothing behind.
#[derive(Debug)]
pub struct PreparedUpdate {
    info: UpdateInfo,
    scratch: TempDir,
    binary: PathBuf,
}

impl PreparedUpdate {
    pub fn info(&self) -> &UpdateInfo {
        &self.info
    }

    /// Path of the extracted executable inside the scratch directory.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Remove the scratch directory, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<(), UpdateError> {
        let path = self.scratch.path().to_path_buf();
        self.scratch.close().map_err(|e| UpdateError::fs("removing scratch directory", &path, e))
    }
}

/// Result of a full [`SelfUpdater::update`] run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The channel offered nothing newer and the update was not forced.
    UpToDate(UpdateInfo),
    /// The new binary is in place. Returned only when restart is disabled,
    /// since a successful restart never comes back.
    Installed(UpdateInfo),
}

/// Drives the update pipeline for the running binary.
///
/// `SelfUpdater` wires the stages together in order:
///
/// ```text
/// check_for_update ─► download ─► verify ─► extract ─► apply
///   (resolver)      (scratch)  (checksum)  (scratch)  (installer)
/// ```
///
/// Everything up to and including extraction happens inside a scratch
/// directory owned by a [`PreparedUpdate`]. Those stages may be cancelled
/// freely: dropping the future drops the scratch guard. During extraction the
/// blocking task holds the guard and drops it when it finishes. [`apply`](Self::apply)
/// is the only stage that touches the installed executable and must not be
/// raced against cancellation.
///
/// No stage retries. A failed check, download or verification is returned to
/// the caller as-is.
///
/// # Examples
///
/// ```rust,no_run
/// use assistd::upgrade::{Channel, SelfUpdater, UpgradeConfig};
///
/// # async fn example() -> Result<(), assistd::core::UpdateError> {
/// let updater = SelfUpdater::from_config(env!("CARGO_PKG_VERSION"), UpgradeConfig::default())?;
///
/// let info = updater.check_for_update(Channel::Stable).await?;
/// if info.is_newer {
///     let prepared = updater.prepare(&info).await?;
///     updater.apply(prepared, false).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater {
    current_version: String,
    config: UpgradeConfig,
    client: reqwest::Client,
    restarter: Arc<dyn Restarter>,
    show_progress: bool,
    scratch_root: Option<PathBuf>,
}

impl SelfUpdater {
    pub fn new(current_version: impl Into<String>, client: reqwest::Client, config: UpgradeConfig) -> Self {
        Self {
            current_version: current_version.into(),
            config,
            client,
            restarter: Arc::new(ExecRestarter),
            show_progress: true,
            scratch_root: None,
        }
    }

    /// Updater with a freshly built HTTP client.
    pub fn from_config(current_version: impl Into<String>, config: UpgradeConfig) -> Result<Self, UpdateError> {
        Ok(Self::new(current_version, build_client()?, config))
    }

    #[must_use]
    pub fn with_restarter(mut self, restarter: Arc<dyn Restarter>) -> Self {
        self.restarter = restarter;
        self
    }

    /// Enable or disable the download progress bar.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    /// Resolve `channel` into an installation plan.
    pub async fn check_for_update(&self, channel: Channel) -> Result<UpdateInfo, UpdateError> {
        ReleaseResolver::new(self.client.clone(), self.config.clone(), self.current_version.clone())
            .check_for_update(channel)
            .await
    }

    /// Download the archive for `info` into `dest_dir`.
    pub async fn download(&self, info: &UpdateInfo, dest_dir: &Path) -> Result<PathBuf, UpdateError> {
        let dest = dest_dir.join(&info.archive_name);
        let downloader = Downloader::new(self.client.clone(), self.config.download_timeout());

        let mut bar: Option<ProgressBar> = None;
        let show_progress = self.show_progress;
        let result = downloader
            .download(&info.download_url, &dest, |done, total| {
                let bar = bar.get_or_insert_with(|| {
                    let bar = if show_progress {
                        ProgressBar::for_download(total)
                    } else {
                        ProgressBar::hidden()
                    };
                    bar.set_message(info.archive_name.clone());
                    bar
                });
                bar.update(done, total);
            })
            .await;

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        result.map(|_| dest)
    }

    /// Check `archive` against the release checksum manifest.
    pub async fn verify(&self, info: &UpdateInfo, archive: &Path) -> Result<(), UpdateError> {
        ChecksumVerifier::new(self.client.clone(), self.config.metadata_timeout())
            .verify(archive, &info.archive_name, &info.checksum_url)
            .await
    }

    /// Unpack `archive` into `dest_dir` and return the executable's path.
    pub async fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<PathBuf, UpdateError> {
        let extractor = ArchiveExtractor::new(self.config.max_extract_file_size);
        let binary_name = self.config.binary_name.clone();
        let archive = archive.to_path_buf();
        let dest = dest_dir.to_path_buf();

        tokio::task::spawn_blocking(move || {
            extractor.extract(&archive, &dest)?;
            locate_binary(&dest, &binary_name)
        })
        .await
        .map_err(|e| UpdateError::fs("extracting", dest_dir, io::Error::other(e)))?
    }

    /// Unpack `archive` into `scratch/extracted`, handing the guard back with the result.
    ///
    /// The blocking task owns `scratch` while it writes. If this future is
    /// dropped, the directory is removed once extraction stops rather than
    /// underneath it.
    async fn extract_into_scratch(&self, scratch: TempDir, archive: PathBuf) -> Result<(TempDir, PathBuf), UpdateError> {
        let extractor = ArchiveExtractor::new(self.config.max_extract_file_size);
        let binary_name = self.config.binary_name.clone();
        let dest = scratch.path().join("extracted");
        let task_dest = dest.clone();

        let (scratch, binary) = tokio::task::spawn_blocking(move || {
            let binary = extractor
                .extract(&archive, &task_dest)
                .and_then(|()| locate_binary(&task_dest, &binary_name));
            (scratch, binary)
        })
        .await
        .map_err(|e| UpdateError::fs("extracting", &dest, io::Error::other(e)))?;

        Ok((scratch, binary?))
    }

    /// Download, verify and extract `info` into a fresh scratch directory.
    ///
    /// On any failure the scratch directory is removed before returning.
    pub async fn prepare(&self, info: &UpdateInfo) -> Result<PreparedUpdate, UpdateError> {
        let root = self.scratch_root.clone().unwrap_or_else(std::env::temp_dir);
        let scratch = tempfile::Builder::new()
            .prefix("assistd-update-")
            .tempdir_in(&root)
            .map_err(|e| UpdateError::fs("creating scratch directory", &root, e))?;
        debug!(scratch = %scratch.path().display(), "Created scratch directory");

        let archive = self.download(info, scratch.path()).await?;
        self.verify(info, &archive).await?;
        let (scratch, binary) = self.extract_into_scratch(scratch, archive).await?;

        info!(version = %info.new_version, "Update prepared");
        Ok(PreparedUpdate {
            info: info.clone(),
            scratch,
            binary,
        })
    }

    /// Install `prepared` over the running executable.
    pub async fn apply(&self, prepared: PreparedUpdate, no_restart: bool) -> Result<(), UpdateError> {
        let installer = self.installer_for(Installer::for_current_exe()?);
        self.apply_with(&installer, prepared, no_restart).await
    }

    /// Install `prepared` over an explicit `target` path.
    pub async fn apply_to(&self, target: PathBuf, prepared: PreparedUpdate, no_restart: bool) -> Result<(), UpdateError> {
        let installer = self.installer_for(Installer::new(target));
        self.apply_with(&installer, prepared, no_restart).await
    }

    /// Run the whole pipeline against the running executable.
    ///
    /// Any state left by an interrupted earlier install is repaired first.
    /// With `force`, the channel's release is installed even when it is not
    /// newer than the running version.
    pub async fn update(&self, channel: Channel, force: bool, no_restart: bool) -> Result<UpdateOutcome, UpdateError> {
        let installer = self.installer_for(Installer::for_current_exe()?);
        self.update_with(&installer, channel, force, no_restart).await
    }

    /// [`update`](Self::update) against an explicit `target` path.
    pub async fn update_target(
        &self,
        target: PathBuf,
        channel: Channel,
        force: bool,
        no_restart: bool,
    ) -> Result<UpdateOutcome, UpdateError> {
        let installer = self.installer_for(Installer::new(target));
        self.update_with(&installer, channel, force, no_restart).await
    }

    /// Repair an interrupted install of the running executable.
    pub async fn recover(&self) -> Result<Recovery, UpdateError> {
        Installer::for_current_exe()?.backup().recover_interrupted().await
    }

    fn installer_for(&self, installer: Installer) -> Installer {
        installer.with_restarter(self.restarter.clone())
    }

    async fn update_with(
        &self,
        installer: &Installer,
        channel: Channel,
        force: bool,
        no_restart: bool,
    ) -> Result<UpdateOutcome, UpdateError> {
        let recovery = installer.backup().recover_interrupted().await?;
        if recovery != Recovery::Clean {
            info!(?recovery, "Repaired state from a previous install");
        }

        let info = self.check_for_update(channel).await?;
        if !info.is_newer && !force {
            info!(version = %self.current_version, "Already on the latest version");
            return Ok(UpdateOutcome::UpToDate(info));
        }

        let prepared = self.prepare(&info).await?;
        self.apply_with(installer, prepared, no_restart).await?;
        Ok(UpdateOutcome::Installed(info))
    }

    async fn apply_with(&self, installer: &Installer, prepared: PreparedUpdate, no_restart: bool) -> Result<(), UpdateError> {
        let installed = installer.install(prepared.binary()).await;

        // exec skips destructors, so the scratch directory goes first
        if let Err(e) = prepared.close() {
            warn!(error = %e, "Failed to remove scratch directory");
        }
        installed?;

        if no_restart {
            debug!("Restart disabled");
            return Ok(());
        }
        installer.restart()
    }
}

/// HTTP client shared by every stage of an update.
pub fn build_client() -> Result<reqwest::Client, UpdateError> {
    reqwest::Client::builder().user_agent(USER_AGENT).build().map_err(|e| UpdateError::Network {
        operation: "building HTTP client".to_string(),
        url: String::new(),
        reason: e.to_string(),
    })
}
