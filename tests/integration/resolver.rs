//! Channel resolution against the releases API.

use anyhow::Result;
use assistd::core::ErrorKind;
use assistd::upgrade::{Channel, ReleaseResolver};

use crate::common::{ReleaseServer, host_archive_name, release_json};

fn resolver(server: &ReleaseServer, current: &str) -> ReleaseResolver {
    ReleaseResolver::new(reqwest::Client::new(), server.config("assistd"), current)
}

/// Drafts are never offered, even when they are the newest beta.
#[tokio::test]
async fn test_beta_skips_drafts() -> Result<()> {
    let server = ReleaseServer::start().await;
    server
        .mount_release_list(vec![
            release_json("v1.1.0-beta.2", true, true),
            release_json("v1.1.0-beta.1", true, false),
        ])
        .await;

    let info = resolver(&server, "1.0.0").check_for_update(Channel::Beta).await?;

    assert_eq!(info.tag, "v1.1.0-beta.1");
    assert_eq!(info.new_version, "1.1.0-beta.1");
    assert!(info.is_newer);
    assert_eq!(info.archive_name, host_archive_name("assistd", "1.1.0-beta.1"));
    assert!(info.download_url.ends_with(&format!("/releases/download/v1.1.0-beta.1/{}", info.archive_name)));
    assert!(info.checksum_url.ends_with("/releases/download/v1.1.0-beta.1/checksums.txt"));
    Ok(())
}

/// The rc channel picks the first rc tag in API order, ignoring betas.
#[tokio::test]
async fn test_rc_channel_selects_first_rc() -> Result<()> {
    let server = ReleaseServer::start().await;
    server
        .mount_release_list(vec![
            release_json("v2.0.0-beta.3", true, false),
            release_json("v2.0.0-rc.1", true, false),
            release_json("v2.0.0-rc.2", true, false),
        ])
        .await;

    let info = resolver(&server, "1.0.0").check_for_update(Channel::Rc).await?;

    assert_eq!(info.tag, "v2.0.0-rc.1");
    assert_eq!(info.channel, Channel::Rc);
    Ok(())
}

/// A release list with nothing on the channel is a not-found error.
#[tokio::test]
async fn test_rc_without_candidates() -> Result<()> {
    let server = ReleaseServer::start().await;
    server
        .mount_release_list(vec![release_json("v1.0.0", false, false), release_json("v1.1.0-beta.1", true, false)])
        .await;

    let err = resolver(&server, "1.0.0").check_for_update(Channel::Rc).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("rc"));
    Ok(())
}

/// Stable with no published release maps the API's 404 to not-found.
#[tokio::test]
async fn test_stable_404() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_no_latest().await;

    let err = resolver(&server, "1.0.0").check_for_update(Channel::Stable).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

/// An older stable release is reported but not flagged as newer.
#[tokio::test]
async fn test_stable_not_newer() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json("v1.0.0", false, false)).await;

    let info = resolver(&server, "1.2.0").check_for_update(Channel::Stable).await?;

    assert_eq!(info.new_version, "1.0.0");
    assert!(!info.is_newer);
    Ok(())
}

#[test]
fn test_unknown_channel_name_is_rejected() {
    let err = "nightly".parse::<Channel>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!("prerelease".parse::<Channel>().is_err());
    assert_eq!("Beta".parse::<Channel>().ok(), Some(Channel::Beta));
}

/// A tag that would reshape the download path is refused before any URL is built.
#[tokio::test]
async fn test_path_shaped_tag_is_rejected() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.mount_latest(release_json("v1.0.0/../../../other/repo", false, false)).await;

    let err = resolver(&server, "0.9.0").check_for_update(Channel::Stable).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(err.to_string().contains("release tag"));
    Ok(())
}
