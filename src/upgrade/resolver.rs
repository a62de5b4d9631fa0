//! Release resolution against the GitHub releases API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{CHECKSUM_MANIFEST_NAME, GITHUB_ACCEPT, USER_AGENT};
use crate::core::UpdateError;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::release::{Channel, Release};
use crate::upgrade::version::is_newer_version;
use crate::utils::platform::{arch_identifier, os_identifier};

/// A resolved installation plan.
///
/// The archive name and both URLs are computed from `new_version` and the
/// host platform. Asset URLs from the release payload are never used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub current_version: String,
    pub new_version: String,
    /// `v{new_version}`
    pub tag: String,
    pub channel: Channel,
    pub changelog: String,
    pub archive_name: String,
    pub download_url: String,
    pub checksum_url: String,
    pub is_newer: bool,
}

/// Archive file name for a version on a given platform.
///
/// # Examples
///
/// ```rust
/// use assistd::upgrade::resolver::archive_name;
///
/// assert_eq!(
///     archive_name("assistd", "1.2.0", "darwin", "arm64"),
///     "assistd_1.2.0_darwin_arm64.tar.gz"
/// );
/// ```
#[must_use]
pub fn archive_name(binary: &str, version: &str, os: &str, arch: &str) -> String {
    format!("{binary}_{version}_{os}_{arch}.tar.gz")
}

/// Whether `version` is safe to splice into a download URL path.
///
/// Only ASCII alphanumerics and `.`, `+`, `-` are accepted, so a tag can
/// never add path segments, a query or a fragment.
#[must_use]
pub fn is_url_safe_version(version: &str) -> bool {
    !version.is_empty()
        && !version.contains("..")
        && version.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-'))
}

/// Pick the most recent non-draft release on `channel` from an API listing.
///
/// The listing is taken to be newest first, as the API returns it; no
/// re-sorting happens here. Only `Beta` and `Rc` carry a tag marker, so
/// other channels never match.
#[must_use]
pub fn select_channel_release(releases: &[Release], channel: Channel) -> Option<&Release> {
    let marker = channel.tag_marker()?;
    releases.iter().filter(|r| !r.draft).find(|r| r.tag.contains(marker))
}

/// Resolves the release a channel currently points at.
pub struct ReleaseResolver {
    client: reqwest::Client,
    config: UpgradeConfig,
    current_version: String,
}

impl ReleaseResolver {
    pub fn new(client: reqwest::Client, config: UpgradeConfig, current_version: impl Into<String>) -> Self {
        Self {
            client,
            config,
            current_version: current_version.into(),
        }
    }

    /// Resolve `channel` and compare it against the running version.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::UnknownChannel`] for anything but stable, beta or rc
    /// - [`UpdateError::NoReleasesFound`] when stable has no published release
    /// - [`UpdateError::NoMatchingRelease`] when beta/rc has no matching tag
    /// - [`UpdateError::Network`], [`UpdateError::HttpStatus`] or
    ///   [`UpdateError::Decode`] for transport and payload failures,
    ///   including a tag that is not a plain version string
    pub async fn check_for_update(&self, channel: Channel) -> Result<UpdateInfo, UpdateError> {
        debug!(
            owner = %self.config.repo_owner,
            repo = %self.config.repo_name,
            %channel,
            "Checking for updates"
        );

        let release = match channel {
            Channel::Stable => self.fetch_latest().await?,
            Channel::Beta | Channel::Rc => {
                let releases = self.fetch_releases().await?;
                select_channel_release(&releases, channel).cloned().ok_or_else(|| {
                    UpdateError::NoMatchingRelease {
                        channel: channel.to_string(),
                    }
                })?
            }
            Channel::Prerelease => {
                return Err(UpdateError::UnknownChannel {
                    channel: channel.to_string(),
                });
            }
        };

        let info = self.update_info(&release, channel)?;
        if info.is_newer {
            info!(current = %info.current_version, latest = %info.new_version, "Update available");
        } else {
            debug!(current = %info.current_version, latest = %info.new_version, "Already up to date");
        }
        Ok(info)
    }

    /// `GET /repos/{owner}/{repo}/releases/latest`
    pub async fn fetch_latest(&self) -> Result<Release, UpdateError> {
        let url = format!("{}/latest", self.releases_endpoint());
        match self.get_json(&url, "fetching latest release").await {
            Err(UpdateError::HttpStatus {
                status: 404,
                ..
            }) => {
                warn!(url, "No stable release published");
                Err(UpdateError::NoReleasesFound {
                    channel: Channel::Stable.to_string(),
                })
            }
            other => other,
        }
    }

    /// `GET /repos/{owner}/{repo}/releases`
    pub async fn fetch_releases(&self) -> Result<Vec<Release>, UpdateError> {
        let releases: Vec<Release> = self.get_json(&self.releases_endpoint(), "listing releases").await?;
        debug!(count = releases.len(), "Fetched releases");
        Ok(releases)
    }

    /// Build the installation plan for `release`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Decode`] if the tag's version part contains
    /// anything besides `[0-9A-Za-z.+-]`.
    pub fn update_info(&self, release: &Release, channel: Channel) -> Result<UpdateInfo, UpdateError> {
        let new_version = release.version().to_string();
        if !is_url_safe_version(&new_version) {
            warn!(tag = %release.tag, "Rejecting release tag with unexpected characters");
            return Err(UpdateError::Decode {
                what: format!("release tag '{}'", release.tag),
                reason: "version may only contain ASCII letters, digits, '.', '+' and '-'".to_string(),
            });
        }
        let tag = format!("v{new_version}");
        let archive = archive_name(&self.config.binary_name, &new_version, os_identifier(), arch_identifier());
        let download_base = format!(
            "{}/{}/{}/releases/download/{tag}",
            self.config.releases_base.trim_end_matches('/'),
            self.config.repo_owner,
            self.config.repo_name,
        );

        Ok(UpdateInfo {
            is_newer: is_newer_version(&self.current_version, &new_version),
            current_version: self.current_version.clone(),
            channel,
            changelog: release.changelog().to_string(),
            download_url: format!("{download_base}/{archive}"),
            checksum_url: format!("{download_base}/{CHECKSUM_MANIFEST_NAME}"),
            archive_name: archive,
            new_version,
            tag,
        })
    }

    fn releases_endpoint(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.config.api_base.trim_end_matches('/'),
            self.config.repo_owner,
            self.config.repo_name
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &str) -> Result<T, UpdateError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.config.metadata_timeout())
            .send()
            .await
            .map_err(|e| UpdateError::network(operation, url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                operation: operation.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| UpdateError::network(operation, url, &e))?;
        serde_json::from_str(&body).map_err(|e| UpdateError::Decode {
            what: format!("release metadata from {url}"),
            reason: e.to_string(),
        })
    }
}
