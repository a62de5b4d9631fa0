//! Command-line tests against the compiled `assistd` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

use crate::common::{ReleaseServer, release_json};

/// Command isolated from the user's home and config.
fn assistd(home: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("assistd")?;
    cmd.env("HOME", home)
        .env("ASSISTD_CONFIG_PATH", home.join("config.toml"))
        .env("ASSISTD_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    Ok(cmd)
}

fn write_config(home: &Path, base_url: &str) -> Result<()> {
    let config = format!(
        "[upgrade]\napi_base = \"{base_url}\"\nreleases_base = \"{base_url}\"\nmetadata_timeout_secs = 10\n"
    );
    std::fs::write(home.join("config.toml"), config)?;
    Ok(())
}

#[test]
fn test_help_lists_upgrade() -> Result<()> {
    let home = TempDir::new()?;
    assistd(home.path())?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("--no-progress"));
    Ok(())
}

#[test]
fn test_upgrade_help_shows_flags() -> Result<()> {
    let home = TempDir::new()?;
    assistd(home.path())?
        .args(["upgrade", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-restart"))
        .stdout(predicate::str::contains("--channel"))
        .stdout(predicate::str::contains("--recover"));
    Ok(())
}

#[test]
fn test_unknown_channel_fails() -> Result<()> {
    let home = TempDir::new()?;
    assistd(home.path())?
        .args(["upgrade", "--channel", "nightly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nightly"));
    Ok(())
}

#[test]
fn test_recover_conflicts_with_force() -> Result<()> {
    let home = TempDir::new()?;
    assistd(home.path())?.args(["upgrade", "--recover", "--force"]).assert().failure();
    Ok(())
}

#[test]
fn test_version_prints_package_version() -> Result<()> {
    let home = TempDir::new()?;
    assistd(home.path())?
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("assistd {}", env!("CARGO_PKG_VERSION"))));
    Ok(())
}

#[test]
fn test_malformed_config_is_reported() -> Result<()> {
    let home = TempDir::new()?;
    std::fs::write(home.path().join("config.toml"), "[upgrade\nchannel = ")?;
    assistd(home.path())?.args(["upgrade", "--check"]).assert().failure();
    Ok(())
}

/// `upgrade --check` reports a newer release without installing anything.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upgrade_check_reports_available_version() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json("v99.0.0", false, false)).await;

    let home = TempDir::new()?;
    write_config(home.path(), &server.uri())?;
    let home_path = home.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok(assistd(&home_path)?.args(["upgrade", "--check"]).output()?)
    })
    .await??;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("99.0.0"), "stdout: {stdout}");
    assert!(stdout.contains("update available"), "stdout: {stdout}");
    assert!(stdout.contains("Changes in v99.0.0"), "stdout: {stdout}");
    assert!(home.path().join(".version_cache").exists());
    Ok(())
}

/// With `--config`, the version cache is written beside that file.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upgrade_check_cache_follows_config_flag() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json("v99.0.0", false, false)).await;

    let home = TempDir::new()?;
    let alt = home.path().join("alt");
    std::fs::create_dir(&alt)?;
    write_config(&alt, &server.uri())?;
    let home_path = home.path().to_path_buf();
    let config_path = alt.join("config.toml");

    let output = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok(assistd(&home_path)?
            .arg("--config")
            .arg(&config_path)
            .args(["upgrade", "--check"])
            .output()?)
    })
    .await??;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(alt.join(".version_cache").exists());
    assert!(!home.path().join(".version_cache").exists());
    Ok(())
}

/// `upgrade --check` on the latest version says so.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upgrade_check_up_to_date() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json(&format!("v{}", env!("CARGO_PKG_VERSION")), false, false)).await;

    let home = TempDir::new()?;
    write_config(home.path(), &server.uri())?;
    let home_path = home.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok(assistd(&home_path)?.args(["upgrade", "--check"]).output()?)
    })
    .await??;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("up to date"));
    Ok(())
}

/// A beta check with no beta releases fails with a readable error.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upgrade_check_beta_without_releases_fails() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_release_list(vec![release_json("v1.0.0", false, false)]).await;

    let home = TempDir::new()?;
    write_config(home.path(), &server.uri())?;
    let home_path = home.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok(assistd(&home_path)?.args(["upgrade", "--check", "--channel", "beta"]).output()?)
    })
    .await??;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("beta"));
    Ok(())
}
