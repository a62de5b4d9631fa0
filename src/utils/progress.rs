//! Progress indicators for long-running update steps
//!
//! Thin wrapper over `indicatif` so the rest of the crate does not depend on
//! its styling details. Two shapes are provided: a byte-counting bar when the
//! total size is known and a spinner when it is not (servers that omit
//! `Content-Length`).
//!
//! # Environment Variables
//!
//! - `ASSISTD_NO_PROGRESS`: Set to any value to disable all progress indicators
//!
//! # Examples
//!
//! ```rust,no_run
//! use assistd::utils::progress::ProgressBar;
//!
//! let bar = ProgressBar::for_download(Some(1024));
//! bar.set_message("assistd_1.0.0_linux_amd64.tar.gz");
//! bar.update(512, Some(1024));
//! bar.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Environment variable that disables progress output.
pub const NO_PROGRESS_ENV: &str = "ASSISTD_NO_PROGRESS";

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// A progress bar that is hidden when progress output is disabled.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a bar sized for a download. `None` gives a spinner.
    pub fn for_download(total: Option<u64>) -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }

        let bar = match total {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(download_style());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        Self {
            inner: bar,
        }
    }

    /// A bar that never draws anything.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Record `downloaded` bytes out of `total`, growing the bar if the
    /// server under-reported the length.
    pub fn update(&self, downloaded: u64, total: Option<u64>) {
        if let Some(total) = total
            && self.inner.length() != Some(total)
        {
            self.inner.set_length(total.max(downloaded));
        }
        self.inner.set_position(downloaded);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg:.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg:.bold} {bytes}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
