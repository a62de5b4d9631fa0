//! Executable swap, rollback and recovery of interrupted installs.

use anyhow::Result;
use assistd::core::ErrorKind;
use assistd::upgrade::installer::is_system_managed_path;
use assistd::upgrade::{Channel, Installer, Recovery, SelfUpdater, UpdateOutcome};
use std::path::Path;
use tempfile::TempDir;

use crate::common::{ReleaseServer, release_json};

const OLD_BINARY: &[u8] = b"old binary";

/// A copy that fails midway puts the previous binary back.
#[tokio::test]
async fn test_failed_copy_rolls_back() -> Result<()> {
    let temp = TempDir::new()?;
    let exe = temp.path().join("assistd");
    std::fs::write(&exe, OLD_BINARY)?;

    // A directory cannot be copied as a file, so the swap fails after the
    // original has already been moved aside
    let not_a_file = temp.path().join("new-assistd");
    std::fs::create_dir(&not_a_file)?;

    let installer = Installer::new(exe.clone());
    let err = installer.install(&not_a_file).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallIo);
    assert_eq!(std::fs::read(&exe)?, OLD_BINARY);
    assert!(!installer.backup().backup_exists());
    Ok(())
}

/// Executable gone and `.old` present: the backup is renamed back.
#[tokio::test]
async fn test_recover_restores_missing_executable() -> Result<()> {
    let temp = TempDir::new()?;
    let exe = temp.path().join("assistd");
    std::fs::write(temp.path().join("assistd.old"), OLD_BINARY)?;

    let recovery = Installer::new(exe.clone()).backup().recover_interrupted().await?;

    assert_eq!(recovery, Recovery::Restored);
    assert_eq!(std::fs::read(&exe)?, OLD_BINARY);
    assert!(!temp.path().join("assistd.old").exists());
    Ok(())
}

/// Both present: the install finished, only the backup was left behind.
#[tokio::test]
async fn test_recover_removes_stale_backup() -> Result<()> {
    let temp = TempDir::new()?;
    let exe = temp.path().join("assistd");
    std::fs::write(&exe, b"new binary")?;
    std::fs::write(temp.path().join("assistd.old"), OLD_BINARY)?;

    let recovery = Installer::new(exe.clone()).backup().recover_interrupted().await?;

    assert_eq!(recovery, Recovery::RemovedStale);
    assert_eq!(std::fs::read(&exe)?, b"new binary");
    assert!(!temp.path().join("assistd.old").exists());
    Ok(())
}

#[tokio::test]
async fn test_recover_clean_is_noop() -> Result<()> {
    let temp = TempDir::new()?;
    let exe = temp.path().join("assistd");
    std::fs::write(&exe, OLD_BINARY)?;

    let recovery = Installer::new(exe.clone()).backup().recover_interrupted().await?;

    assert_eq!(recovery, Recovery::Clean);
    assert_eq!(std::fs::read(&exe)?, OLD_BINARY);
    Ok(())
}

/// An update run repairs an interrupted install before anything else.
#[tokio::test]
async fn test_update_repairs_interrupted_install_first() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json("v1.0.0", false, false)).await;

    let temp = TempDir::new()?;
    let exe = temp.path().join("assistd");
    std::fs::write(temp.path().join("assistd.old"), OLD_BINARY)?;

    let updater = SelfUpdater::new("1.0.0", reqwest::Client::new(), server.config("assistd")).with_progress(false);
    let outcome = updater.update_target(exe.clone(), Channel::Stable, false, true).await?;

    assert!(matches!(outcome, UpdateOutcome::UpToDate(_)));
    assert_eq!(std::fs::read(&exe)?, OLD_BINARY);
    Ok(())
}

#[test]
fn test_system_managed_paths() {
    assert!(is_system_managed_path(Path::new("/usr/bin/assistd")));
    assert!(is_system_managed_path(Path::new("/nix/store/abc-assistd/bin/assistd")));
    assert!(!is_system_managed_path(Path::new("/home/me/.local/bin/assistd")));
}
