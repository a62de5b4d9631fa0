//! assistd - personal assistant daemon
//!
//! This crate holds the `assistd` binary's library half: the command-line
//! surface and the self-update pipeline that lets the installed binary
//! replace itself with a newer GitHub release.
//!
//! # Architecture Overview
//!
//! An upgrade is a linear pipeline with one critical section:
//!
//! ```text
//! resolve ─► download ─► verify ─► extract ─► install ─► restart
//! └────────── scratch directory, cancellable ──────┘  └── not cancellable ──┘
//! ```
//!
//! Everything before the install stage writes only to a temporary scratch
//! directory that is removed on every exit path. The install stage renames
//! the running executable to `<exe>.old`, copies the new binary into place
//! and restores the backup if the copy fails.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`assistd upgrade`, `assistd version`)
//! - [`config`] - Global configuration (`~/.assistd/config.toml`)
//! - [`constants`] - Endpoints, timeouts and limits
//! - [`core`] - Error types and user-facing error rendering
//! - [`upgrade`] - The self-update pipeline
//! - [`utils`] - Platform identification, path cleaning, progress bars
//!
//! # Example
//!
//! ```rust,no_run
//! use assistd::upgrade::{Channel, SelfUpdater, UpgradeConfig, UpdateOutcome};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let updater = SelfUpdater::from_config(env!("CARGO_PKG_VERSION"), UpgradeConfig::default())?;
//!
//! match updater.update(Channel::Stable, false, true).await? {
//!     UpdateOutcome::UpToDate(info) => println!("Already on {}", info.current_version),
//!     UpdateOutcome::Installed(info) => println!("Installed {}", info.new_version),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
