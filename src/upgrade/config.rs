use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;
use crate::upgrade::release::Channel;

/// Configuration settings for assistd self-update behavior.
///
/// Lives under the `[upgrade]` table of the global config file. Every field has
/// a serde default so a partial (or absent) table is valid.
///
/// # Configuration Categories
///
/// ## Release Source
/// - **Repository**: `repo_owner` / `repo_name` on GitHub
/// - **Endpoints**: `api_base` for release metadata, `releases_base` for
///   archive and checksum downloads. Tests point both at a mock server.
/// - **Channel**: which release track to follow by default
///
/// ## Limits
/// - **Timeouts**: short for metadata, long for archive downloads
/// - **Extraction cap**: maximum bytes written per archive entry
///
/// ## Update Timing
/// - **Startup Checks**: whether to check for updates when assistd starts
/// - **Check Intervals**: how long a cached check result stays fresh
///
/// # TOML Example
/// ```toml
/// [upgrade]
/// channel = "beta"
/// check_on_startup = true
/// check_interval = 86400
/// download_timeout_secs = 900
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    #[serde(default)]
    pub channel: Channel,

    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Name of the executable inside the release archive.
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_releases_base")]
    pub releases_base: String,

    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_max_extract_file_size")]
    pub max_extract_file_size: u64,

    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,

    /// Seconds a cached update check stays valid. `0` disables caching.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            binary_name: default_binary_name(),
            api_base: default_api_base(),
            releases_base: default_releases_base(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            max_extract_file_size: default_max_extract_file_size(),
            check_on_startup: default_check_on_startup(),
            check_interval: default_check_interval(),
        }
    }
}

fn default_repo_owner() -> String {
    constants::DEFAULT_REPO_OWNER.to_string()
}

fn default_repo_name() -> String {
    constants::DEFAULT_REPO_NAME.to_string()
}

fn default_binary_name() -> String {
    constants::APP_NAME.to_string()
}

fn default_api_base() -> String {
    constants::DEFAULT_API_BASE.to_string()
}

fn default_releases_base() -> String {
    constants::DEFAULT_RELEASES_BASE.to_string()
}

fn default_metadata_timeout_secs() -> u64 {
    constants::METADATA_TIMEOUT.as_secs()
}

fn default_download_timeout_secs() -> u64 {
    constants::DOWNLOAD_TIMEOUT.as_secs()
}

fn default_max_extract_file_size() -> u64 {
    constants::MAX_EXTRACT_FILE_SIZE
}

fn default_check_on_startup() -> bool {
    false // Avoid a network round-trip on every daemon start
}

fn default_check_interval() -> u64 {
    86400 // 24 hours in seconds
}

impl UpgradeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point both the API and the download endpoints at `base`.
    ///
    /// Used by tests that serve everything from a single mock server.
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.api_base = base.clone();
        self.releases_base = base;
        self
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
