//! Command-line interface for assistd.
//!
//! # Available Commands
//!
//! - `upgrade` - Check for and install new releases of assistd
//! - `version` - Print the running version
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only
//! - `--config` / `-c` - Use a different global config file
//! - `--no-progress` - Disable progress bars
//!
//! # Logging
//!
//! Logs go to stderr through `tracing`. `RUST_LOG` takes precedence over the
//! verbosity flags when set.
//!
//! ```bash
//! RUST_LOG=assistd::upgrade=trace assistd upgrade --check
//! ```

mod upgrade;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;
use crate::constants::APP_NAME;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::{SelfUpdater, VersionChecker};

pub use upgrade::UpgradeArgs;

/// Settings derived from global flags, applied before a command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    pub no_progress: bool,
    /// Global config file override from `--config`.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory for per-user state such as the version cache: the directory
    /// of the `--config` file when given, otherwise the default config dir.
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }),
            None => GlobalConfig::config_dir(),
        }
    }
}

/// Top-level parser.
#[derive(Parser)]
#[command(
    name = "assistd",
    about = "Personal assistant daemon",
    version,
    long_about = "assistd is a personal-assistant daemon and CLI. This binary can update itself from published GitHub releases."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global config file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade assistd to the latest release on a channel
    Upgrade(UpgradeArgs),

    /// Print the assistd version
    Version,
}

impl Cli {
    /// Run the selected command with configuration from the global flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        init_logging(config.log_level.as_deref());

        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;
        let show_progress = !config.no_progress;
        let state_dir = config.state_dir()?;

        match self.command {
            Commands::Upgrade(args) => upgrade::execute(args, global.upgrade, show_progress, &state_dir).await,
            Commands::Version => {
                println!("{APP_NAME} {}", env!("CARGO_PKG_VERSION"));
                notify_if_update_available(global.upgrade, &state_dir).await;
                Ok(())
            }
        }
    }
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `default_level`; with neither, only warnings and
/// errors are shown. Calling this more than once is harmless.
pub fn init_logging(default_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.unwrap_or("warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Opt-in startup check; never fails the command.
async fn notify_if_update_available(config: UpgradeConfig, state_dir: &Path) {
    if !config.check_on_startup {
        return;
    }

    let result = match SelfUpdater::from_config(env!("CARGO_PKG_VERSION"), config.clone()) {
        Ok(updater) => VersionChecker::new(updater, config, state_dir).check_for_updates_if_needed().await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(Some(latest)) => VersionChecker::display_update_notification(&latest),
        Ok(None) => {}
        Err(e) => debug!(error = %e, "Startup update check failed"),
    }
}
