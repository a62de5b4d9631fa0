use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::upgrade::SelfUpdater;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::release::Channel;
use crate::upgrade::resolver::UpdateInfo;
use crate::upgrade::version::is_newer_version;
use crate::utils::fs::atomic_write;

/// File name of the update-check cache inside the config directory.
pub const VERSION_CACHE_FILE: &str = ".version_cache";

/// Cached version information with notification tracking.
///
/// Serialized to JSON between runs so that startup checks hit the network at
/// most once per `check_interval`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCheckCache {
    /// The latest version on the checked channel (e.g., "1.2.0").
    pub latest_version: String,
    /// The version that was running when this cache was created.
    pub current_version: String,
    /// Channel the check ran against.
    #[serde(default)]
    pub channel: Channel,
    /// UTC timestamp when this version information was fetched.
    pub checked_at: DateTime<Utc>,
    pub update_available: bool,
    /// Whether the user has been notified about this specific update.
    pub notified: bool,
    #[serde(default)]
    pub notification_count: u32,
}

impl VersionCheckCache {
    pub fn new(current_version: String, latest_version: String, channel: Channel) -> Self {
        Self {
            update_available: is_newer_version(&current_version, &latest_version),
            latest_version,
            current_version,
            channel,
            checked_at: Utc::now(),
            notified: false,
            notification_count: 0,
        }
    }

    /// Check if the cache is still valid based on the given interval.
    pub fn is_valid(&self, interval_seconds: u64) -> bool {
        let age = Utc::now() - self.checked_at;
        age.num_seconds() < i64::try_from(interval_seconds).unwrap_or(i64::MAX)
    }

    /// Mark this update as notified and increment the count.
    pub fn mark_notified(&mut self) {
        self.notified = true;
        self.notification_count += 1;
    }

    /// Check if we should notify about this update.
    ///
    /// The first notification is immediate. Reminders after the n-th notice
    /// wait `24h * 2^(n-1)`: 24h, 48h, 96h and then every 192h.
    pub fn should_notify(&self) -> bool {
        if !self.update_available {
            return false;
        }
        if !self.notified {
            return true;
        }

        let hours_since_check = (Utc::now() - self.checked_at).num_hours();
        let backoff_hours = 24 * (1i64 << self.notification_count.saturating_sub(1).min(3));
        hours_since_check >= backoff_hours
    }
}

/// Cached, opt-in update checks for startup notifications.
///
/// Check failures are logged and swallowed by
/// [`check_for_updates_if_needed`](Self::check_for_updates_if_needed) so a
/// flaky network never fails the command that triggered the check.
///
/// # Cache Location
///
/// The CLI keeps the cache file next to the global config file:
/// - Unix/macOS: `~/.assistd/.version_cache`
/// - Windows: `%LOCALAPPDATA%\assistd\.version_cache`
/// - With `--config` or `ASSISTD_CONFIG_PATH`: the directory of that file
pub struct VersionChecker {
    cache_path: PathBuf,
    updater: SelfUpdater,
    config: UpgradeConfig,
}

impl VersionChecker {
    /// Create a checker keeping its cache file in `cache_dir`, normally the
    /// directory of the global config file.
    pub fn new(updater: SelfUpdater, config: UpgradeConfig, cache_dir: &Path) -> Self {
        Self {
            cache_path: cache_dir.join(VERSION_CACHE_FILE),
            updater,
            config,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Check for updates when enabled and the cache has expired.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(version))` - Update available and the user should be told now
    /// - `Ok(None)` - Disabled, nothing new, or notified recently
    pub async fn check_for_updates_if_needed(&self) -> Result<Option<String>> {
        if !self.config.check_on_startup || self.config.check_interval == 0 {
            debug!("Automatic update checking is disabled");
            return Ok(None);
        }

        let mut cache = match self.load_cache().await {
            Ok(cache) => cache,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable version cache");
                None
            }
        };

        // Results recorded by a different binary or for another channel are stale
        let expired = cache.as_ref().is_none_or(|c| {
            c.channel != self.config.channel
                || c.current_version != self.updater.current_version()
                || !c.is_valid(self.config.check_interval)
        });

        if !expired {
            if let Some(c) = cache.as_mut()
                && c.should_notify()
            {
                c.mark_notified();
                self.save_cache(c).await?;
                info!(current = %c.current_version, latest = %c.latest_version, "Update available (reminder)");
                return Ok(Some(c.latest_version.clone()));
            }
            return Ok(None);
        }

        debug!(channel = %self.config.channel, "Performing automatic update check");
        let info = match self.updater.check_for_update(self.config.channel).await {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "Update check failed");
                return Ok(None);
            }
        };

        let mut fresh = VersionCheckCache::new(
            self.updater.current_version().to_string(),
            info.new_version.clone(),
            self.config.channel,
        );

        // A version we already announced waits for its backoff
        let announce = fresh.update_available
            && cache
                .as_ref()
                .is_none_or(|old| old.latest_version != info.new_version || old.should_notify());
        if announce {
            fresh.mark_notified();
        } else if let Some(old) = cache.as_ref().filter(|old| old.latest_version == info.new_version) {
            fresh.notified = old.notified;
            fresh.notification_count = old.notification_count;
        }
        self.save_cache(&fresh).await?;

        if announce {
            info!(current = %info.current_version, latest = %info.new_version, "Update available");
            Ok(Some(info.new_version))
        } else {
            Ok(None)
        }
    }

    /// Check now, bypassing the cache, and record the result.
    ///
    /// The returned plan carries `is_newer` and the changelog for display.
    /// Failing to write the cache is logged, not returned.
    pub async fn check_now(&self) -> Result<UpdateInfo> {
        debug!("Performing explicit update check");

        let info = self.updater.check_for_update(self.config.channel).await?;
        let cache = VersionCheckCache::new(
            self.updater.current_version().to_string(),
            info.new_version.clone(),
            self.config.channel,
        );
        if let Err(e) = self.save_cache(&cache).await {
            debug!(error = %e, "Could not record update check");
        }

        Ok(info)
    }

    async fn load_cache(&self) -> Result<Option<VersionCheckCache>> {
        if !self.cache_path.exists() {
            debug!("No version cache found");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.cache_path)
            .await
            .context("Failed to read version cache")?;
        let cache = serde_json::from_str(&content).context("Failed to parse version cache")?;
        Ok(Some(cache))
    }

    async fn save_cache(&self, cache: &VersionCheckCache) -> Result<()> {
        let content = serde_json::to_string_pretty(cache).context("Failed to serialize version cache")?;
        atomic_write(&self.cache_path, content.as_bytes()).context("Failed to write version cache")?;
        debug!(path = %self.cache_path.display(), "Saved version check to cache");
        Ok(())
    }

    /// Remove the cache file, forcing the next check to hit the network.
    pub async fn clear_cache(&self) -> Result<()> {
        if self.cache_path.exists() {
            fs::remove_file(&self.cache_path)
                .await
                .context("Failed to remove version cache")?;
            debug!("Cleared version cache");
        }
        Ok(())
    }

    /// Print an update banner to stderr.
    pub fn display_update_notification(latest_version: &str) {
        use colored::Colorize;

        let current_version = env!("CARGO_PKG_VERSION");
        let rule = "-".repeat(56);

        eprintln!();
        eprintln!("{}", rule.bright_cyan());
        eprintln!("A new version of assistd is available!");
        eprintln!();
        eprintln!("  Current version: {}", current_version.yellow());
        eprintln!("  Latest version:  {}", latest_version.green().bold());
        eprintln!();
        eprintln!("  Run {} to upgrade", "assistd upgrade".cyan().bold());
        eprintln!();
        eprintln!("  To disable these checks, set {} in the config file", "upgrade.check_on_startup = false".dimmed());
        eprintln!("{}", rule.bright_cyan());
        eprintln!();
    }

    /// Human-readable current/latest summary.
    pub fn format_version_info(current: &str, latest: Option<&str>) -> String {
        match latest {
            Some(v) if is_newer_version(current, v) => {
                format!("Current version: {current}\nLatest version:  {v} (update available)")
            }
            _ => format!("Current version: {current} (up to date)"),
        }
    }
}
