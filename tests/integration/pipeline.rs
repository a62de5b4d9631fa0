//! End-to-end upgrade tests: check, download, verify, extract and install
//! against a mock GitHub.

use anyhow::Result;
use assistd::core::{ErrorKind, UpdateError};
use assistd::test_utils::{ArchiveBuilder, checksum_manifest, init_test_logging};
use assistd::upgrade::{Channel, Restarter, SelfUpdater, UpdateOutcome, UpgradeConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::common::{ReleaseServer, host_archive_name, release_json};

const NEW_BINARY: &[u8] = b"#!/bin/sh\necho app 1.0.0\n";
const OLD_BINARY: &[u8] = b"#!/bin/sh\necho app 0.9.0\n";

/// Records restart requests instead of replacing the test process.
#[derive(Default)]
struct RecordingRestarter {
    calls: Mutex<Vec<PathBuf>>,
}

impl RecordingRestarter {
    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Restarter for RecordingRestarter {
    fn restart(&self, path: &Path, _args: &[OsString], _env: &[(OsString, OsString)]) -> Result<(), UpdateError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(path.to_path_buf());
        }
        Ok(())
    }
}

fn release_archive(binary: &str, contents: &[u8]) -> Result<Vec<u8>> {
    ArchiveBuilder::new()
        .file(binary, contents, 0o755)?
        .file("README.md", b"# app\n", 0o644)?
        .finish()
}

struct Workspace {
    _dir: TempDir,
    exe: PathBuf,
    scratch_root: PathBuf,
}

impl Workspace {
    fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let exe = dir.path().join("app");
        std::fs::write(&exe, OLD_BINARY)?;
        let scratch_root = dir.path().join("scratch");
        std::fs::create_dir(&scratch_root)?;
        Ok(Self {
            _dir: dir,
            exe,
            scratch_root,
        })
    }

    fn updater(&self, version: &str, config: UpgradeConfig) -> SelfUpdater {
        SelfUpdater::new(version, reqwest::Client::new(), config)
            .with_progress(false)
            .with_scratch_root(&self.scratch_root)
    }

    fn scratch_entries(&self) -> Result<usize> {
        Ok(std::fs::read_dir(&self.scratch_root)?.count())
    }

    fn backup_path(&self) -> PathBuf {
        self.exe.with_file_name("app.old")
    }
}

/// A stable release newer than the running version is installed in place.
#[tokio::test]
async fn test_stable_upgrade_installs_new_binary() -> Result<()> {
    init_test_logging(None);
    let server = ReleaseServer::start().await;
    server.publish_stable("app", "1.0.0", release_archive("app", NEW_BINARY)?).await;

    let ws = Workspace::new()?;
    let outcome = ws
        .updater("0.9.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await?;

    match outcome {
        UpdateOutcome::Installed(info) => {
            assert_eq!(info.new_version, "1.0.0");
            assert_eq!(info.current_version, "0.9.0");
            assert_eq!(info.archive_name, host_archive_name("app", "1.0.0"));
        }
        other => panic!("expected an install, got {other:?}"),
    }

    assert_eq!(std::fs::read(&ws.exe)?, NEW_BINARY);
    assert!(!ws.backup_path().exists());
    assert_eq!(ws.scratch_entries()?, 0);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&ws.exe)?.permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
    Ok(())
}

/// After a successful install the restarter is invoked with the installed path.
#[tokio::test]
async fn test_restart_targets_installed_binary() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish_stable("app", "1.0.0", release_archive("app", NEW_BINARY)?).await;

    let ws = Workspace::new()?;
    let restarter = Arc::new(RecordingRestarter::default());
    ws.updater("0.9.0", server.config("app"))
        .with_restarter(restarter.clone())
        .update_target(ws.exe.clone(), Channel::Stable, false, false)
        .await?;

    assert_eq!(restarter.calls(), vec![ws.exe.clone()]);
    assert_eq!(ws.scratch_entries()?, 0);
    Ok(())
}

/// `no_restart` installs without touching the restarter.
#[tokio::test]
async fn test_no_restart_skips_restarter() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish_stable("app", "1.0.0", release_archive("app", NEW_BINARY)?).await;

    let ws = Workspace::new()?;
    let restarter = Arc::new(RecordingRestarter::default());
    ws.updater("0.9.0", server.config("app"))
        .with_restarter(restarter.clone())
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await?;

    assert!(restarter.calls().is_empty());
    Ok(())
}

/// A tampered archive is rejected before anything is installed.
#[tokio::test]
async fn test_checksum_mismatch_leaves_binary_untouched() -> Result<()> {
    let server = ReleaseServer::start().await;
    let archive = host_archive_name("app", "1.0.0");
    let genuine = release_archive("app", NEW_BINARY)?;
    let tampered = release_archive("app", b"#!/bin/sh\necho pwned\n")?;

    server.mount_latest(release_json("v1.0.0", false, false)).await;
    server
        .mount_manifest("v1.0.0", checksum_manifest(&[(archive.as_str(), genuine.as_slice())]))
        .await;
    server.mount_archive("v1.0.0", &archive, tampered).await;

    let ws = Workspace::new()?;
    let err = ws
        .updater("0.9.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    assert_eq!(std::fs::read(&ws.exe)?, OLD_BINARY);
    assert!(!ws.backup_path().exists());
    assert_eq!(ws.scratch_entries()?, 0);
    Ok(())
}

/// Only an exact file name match in the manifest counts.
#[tokio::test]
async fn test_lookalike_manifest_entry_is_not_accepted() -> Result<()> {
    let server = ReleaseServer::start().await;
    let archive = host_archive_name("app", "1.0.0");
    let bytes = release_archive("app", NEW_BINARY)?;
    let lookalike = format!("{archive}.sig");
    let prefixed = format!("old-{archive}");

    server.mount_latest(release_json("v1.0.0", false, false)).await;
    server
        .mount_manifest(
            "v1.0.0",
            checksum_manifest(&[(lookalike.as_str(), bytes.as_slice()), (prefixed.as_str(), bytes.as_slice())]),
        )
        .await;
    server.mount_archive("v1.0.0", &archive, bytes).await;

    let ws = Workspace::new()?;
    let err = ws
        .updater("0.9.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ChecksumNotFound);
    assert_eq!(std::fs::read(&ws.exe)?, OLD_BINARY);
    Ok(())
}

/// An archive without the expected executable fails after extraction.
#[tokio::test]
async fn test_archive_without_binary_fails() -> Result<()> {
    let server = ReleaseServer::start().await;
    let bytes = ArchiveBuilder::new().file("README.md", b"# app\n", 0o644)?.finish()?;
    server.publish_stable("app", "1.0.0", bytes).await;

    let ws = Workspace::new()?;
    let err = ws
        .updater("0.9.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BinaryMissing);
    assert_eq!(std::fs::read(&ws.exe)?, OLD_BINARY);
    assert_eq!(ws.scratch_entries()?, 0);
    Ok(())
}

/// Same version on the channel: nothing is downloaded or installed.
#[tokio::test]
async fn test_up_to_date_does_nothing() -> Result<()> {
    let server = ReleaseServer::start().await;
    // No archive is mounted; any download attempt would fail with a 404
    server.mount_latest(release_json("v1.0.0", false, false)).await;

    let ws = Workspace::new()?;
    let outcome = ws
        .updater("1.0.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await?;

    assert!(matches!(outcome, UpdateOutcome::UpToDate(ref info) if !info.is_newer));
    assert_eq!(std::fs::read(&ws.exe)?, OLD_BINARY);
    Ok(())
}

/// `force` reinstalls the channel's release even when it is not newer.
#[tokio::test]
async fn test_force_reinstalls_current_version() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish_stable("app", "1.0.0", release_archive("app", NEW_BINARY)?).await;

    let ws = Workspace::new()?;
    let outcome = ws
        .updater("1.0.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, true, true)
        .await?;

    assert!(matches!(outcome, UpdateOutcome::Installed(ref info) if !info.is_newer));
    assert_eq!(std::fs::read(&ws.exe)?, NEW_BINARY);
    Ok(())
}

/// A missing stable release surfaces as not-found and changes nothing.
#[tokio::test]
async fn test_no_stable_release() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_no_latest().await;

    let ws = Workspace::new()?;
    let err = ws
        .updater("0.9.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(std::fs::read(&ws.exe)?, OLD_BINARY);
    Ok(())
}

/// A failed download (404 on the archive) removes the scratch directory.
#[tokio::test]
async fn test_failed_download_cleans_scratch() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json("v1.0.0", false, false)).await;

    let ws = Workspace::new()?;
    let err = ws
        .updater("0.9.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Stable, false, true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(ws.scratch_entries()?, 0);
    assert_eq!(std::fs::read(&ws.exe)?, OLD_BINARY);
    Ok(())
}

/// Beta upgrades install the newest non-draft beta build.
#[tokio::test]
async fn test_beta_upgrade_end_to_end() -> Result<()> {
    let server = ReleaseServer::start().await;
    let archive = host_archive_name("app", "1.1.0-beta.1");
    let bytes = release_archive("app", NEW_BINARY)?;

    server
        .mount_release_list(vec![
            release_json("v1.1.0-beta.2", true, true),
            release_json("v1.1.0-beta.1", true, false),
            release_json("v1.0.0", false, false),
        ])
        .await;
    server
        .mount_manifest("v1.1.0-beta.1", checksum_manifest(&[(archive.as_str(), bytes.as_slice())]))
        .await;
    server.mount_archive("v1.1.0-beta.1", &archive, bytes).await;

    let ws = Workspace::new()?;
    let outcome = ws
        .updater("1.0.0", server.config("app"))
        .update_target(ws.exe.clone(), Channel::Beta, false, true)
        .await?;

    match outcome {
        UpdateOutcome::Installed(info) => {
            assert_eq!(info.tag, "v1.1.0-beta.1");
            assert_eq!(info.channel, Channel::Beta);
        }
        other => panic!("expected an install, got {other:?}"),
    }
    assert_eq!(std::fs::read(&ws.exe)?, NEW_BINARY);
    Ok(())
}

/// The staged pieces can be driven one at a time.
#[tokio::test]
async fn test_prepare_then_apply() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish_stable("app", "1.0.0", release_archive("app", NEW_BINARY)?).await;

    let ws = Workspace::new()?;
    let updater = ws.updater("0.9.0", server.config("app"));

    let info = updater.check_for_update(Channel::Stable).await?;
    assert!(info.is_newer);

    let prepared = updater.prepare(&info).await?;
    let scratch = prepared.scratch_dir().to_path_buf();
    assert!(scratch.starts_with(&ws.scratch_root));
    assert_eq!(std::fs::read(prepared.binary())?, NEW_BINARY);

    updater.apply_to(ws.exe.clone(), prepared, true).await?;

    assert!(!scratch.exists());
    assert_eq!(std::fs::read(&ws.exe)?, NEW_BINARY);
    Ok(())
}
