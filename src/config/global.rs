//! Global configuration management for assistd.
//!
//! The global configuration file holds user-wide settings. Today that is the
//! `[upgrade]` table controlling where releases come from and how updates are
//! checked.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.assistd/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\assistd\config.toml`
//!
//! The location can be overridden with the `ASSISTD_CONFIG_PATH` environment
//! variable or the `--config` command-line flag. A missing file is not an
//! error; every setting has a default. assistd only reads this file.
//!
//! # File Format
//!
//! ```toml
//! [upgrade]
//! channel = "beta"
//! check_on_startup = true
//! check_interval = 43200
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use assistd::config::GlobalConfig;
//! use assistd::upgrade::Channel;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! if config.upgrade.channel != Channel::Stable {
//!     println!("Following the {} channel", config.upgrade.channel);
//! }
//! # Ok(())
//! # }
//! ```

use crate::upgrade::config::UpgradeConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "ASSISTD_CONFIG_PATH";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration structure for assistd.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlobalConfig {
    /// Self-update settings.
    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load from the default location, or return defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML syntax
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A missing file yields the default configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (permissions, not found, etc.)
    /// - The file contains invalid TOML syntax
    /// - The TOML structure doesn't match the expected schema
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Path of the global config file.
    ///
    /// `ASSISTD_CONFIG_PATH` wins when set; otherwise
    /// `%LOCALAPPDATA%\assistd\config.toml` on Windows and
    /// `~/.assistd/config.toml` elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("assistd")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".assistd")
        };

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Directory holding the config file and other per-user state.
    pub fn config_dir() -> Result<PathBuf> {
        let path = Self::default_path()?;
        Ok(path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf))
    }
}
