//! `assistd upgrade`: self-update from GitHub releases.
//!
//! # Examples
//!
//! ```bash
//! assistd upgrade --check              # Show what would be installed
//! assistd upgrade                      # Install latest stable and restart
//! assistd upgrade --channel rc         # Install the newest release candidate
//! assistd upgrade --no-restart         # Install without re-executing
//! assistd upgrade --force              # Reinstall, or upgrade a package-managed binary
//! assistd upgrade --recover            # Repair an interrupted install
//! ```
//!
//! Pressing Ctrl-C while the update is being checked, downloaded, verified or
//! extracted aborts cleanly. Once the binary swap has started it runs to
//! completion.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing::debug;

use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::{Channel, Recovery, SelfUpdater, UpdateInfo, VersionChecker, is_system_managed};

/// Command to upgrade assistd to a newer release.
#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// Check for updates without installing.
    ///
    /// Prints the current and available versions and the release notes.
    /// Exits successfully whether or not an update is available.
    #[arg(long, conflicts_with = "recover")]
    pub check: bool,

    /// Release channel to follow: stable, beta or rc.
    ///
    /// Defaults to `upgrade.channel` from the global config, which itself
    /// defaults to stable.
    #[arg(long, value_name = "CHANNEL")]
    pub channel: Option<Channel>,

    /// Install even if already up to date or installed by a package manager.
    #[arg(long)]
    pub force: bool,

    /// Install the new binary but keep running the current process.
    #[arg(long)]
    pub no_restart: bool,

    /// Restore the previous binary left behind by an interrupted upgrade.
    #[arg(long, conflicts_with_all = ["force", "channel"])]
    pub recover: bool,
}

/// Execute the upgrade command.
///
/// `state_dir` holds the version-check cache written by `--check`.
pub async fn execute(args: UpgradeArgs, config: UpgradeConfig, show_progress: bool, state_dir: &Path) -> Result<()> {
    let channel = args.channel.unwrap_or(config.channel);
    let config = UpgradeConfig {
        channel,
        ..config
    };
    let updater = SelfUpdater::from_config(env!("CARGO_PKG_VERSION"), config.clone())?.with_progress(show_progress);

    if args.recover {
        return handle_recover(&updater).await;
    }

    if args.check {
        return check_for_updates(VersionChecker::new(updater, config, state_dir)).await;
    }

    perform_upgrade(&updater, channel, args.force, args.no_restart).await
}

async fn handle_recover(updater: &SelfUpdater) -> Result<()> {
    println!("{}", "Checking for an interrupted upgrade...".cyan());

    match updater.recover().await.context("Failed to recover previous binary")? {
        Recovery::Clean => println!("Nothing to recover"),
        Recovery::Restored => println!("{}", "Restored the previous binary from backup".green()),
        Recovery::RemovedStale => println!("{}", "Removed a leftover backup from a completed upgrade".green()),
    }
    Ok(())
}

async fn check_for_updates(checker: VersionChecker) -> Result<()> {
    println!("{}", "Checking for updates...".cyan());

    let info = checker.check_now().await.context("Failed to check for updates")?;
    let latest = info.is_newer.then_some(info.new_version.as_str());
    println!("{}", VersionChecker::format_version_info(&info.current_version, latest));

    if info.is_newer {
        print_changelog(&info);
        println!("Run {} to install it", upgrade_command(info.channel).cyan().bold());
    }
    Ok(())
}

async fn perform_upgrade(updater: &SelfUpdater, channel: Channel, force: bool, no_restart: bool) -> Result<()> {
    if is_system_managed() && !force {
        eprintln!(
            "{}",
            "assistd appears to be installed by a system package manager.".yellow()
        );
        eprintln!("Upgrade it with that package manager, or pass --force to replace it anyway.");
        bail!("Refusing to replace a package-managed binary");
    }

    match updater.recover().await.context("Failed to recover from a previous upgrade")? {
        Recovery::Restored => println!("{}", "Restored the binary left by an interrupted upgrade".yellow()),
        Recovery::Clean | Recovery::RemovedStale => {}
    }

    println!("{}", "Checking for updates...".cyan());
    let info = updater.check_for_update(channel).await?;

    if !info.is_newer && !force {
        println!(
            "{}",
            format!("You are on the latest {channel} version ({})", info.current_version).green()
        );
        return Ok(());
    }

    println!(
        "Upgrading {} -> {}",
        info.current_version.yellow(),
        info.new_version.green().bold()
    );

    let prepared = tokio::select! {
        prepared = updater.prepare(&info) => prepared?,
        _ = tokio::signal::ctrl_c() => {
            debug!("Interrupted before install");
            bail!("Upgrade cancelled; nothing was changed");
        }
    };

    if !no_restart {
        println!("Installing {} and restarting...", info.new_version);
    }
    updater.apply(prepared, no_restart).await?;

    println!(
        "{}",
        format!("Successfully upgraded to {}", info.new_version).green()
    );
    Ok(())
}

fn print_changelog(info: &UpdateInfo) {
    let notes = info.changelog.trim();
    if notes.is_empty() {
        return;
    }
    println!();
    println!("{}", format!("Release notes for {}:", info.tag).bold());
    for line in notes.lines() {
        println!("  {line}");
    }
    println!();
}

fn upgrade_command(channel: Channel) -> String {
    match channel {
        Channel::Stable => "assistd upgrade".to_string(),
        other => format!("assistd upgrade --channel {other}"),
    }
}
