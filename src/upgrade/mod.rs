//! Self-update functionality for assistd.
//!
//! This module lets the assistd binary replace itself with a newer release
//! published on GitHub. The pipeline is built around one rule: nothing from
//! the network is trusted until its checksum has been verified, and the
//! installed executable is only touched once a verified binary is sitting on
//! local disk.
//!
//! # Architecture Overview
//!
//! ## Pipeline Stages
//!
//! - **[`ReleaseResolver`]**: turns a [`Channel`] into an [`UpdateInfo`] plan
//! - **[`Downloader`]**: streams the archive into a scratch directory
//! - **[`ChecksumVerifier`]**: checks the archive against `checksums.txt`
//! - **[`ArchiveExtractor`]**: unpacks the archive with path and size limits
//! - **[`Installer`]**: swaps the executable and restarts into it
//!
//! [`SelfUpdater`] drives the stages in order. [`VersionChecker`] adds cached,
//! opt-in update notifications on top.
//!
//! ## Update Process Flow
//!
//! ```text
//! 0. Recovery
//!    └── Restore <exe>.old left by an interrupted install
//!
//! 1. Resolve
//!    ├── stable: GET /repos/{owner}/{repo}/releases/latest
//!    └── beta/rc: GET /repos/{owner}/{repo}/releases, first non-draft match
//!
//! 2. Prepare (scratch directory, removed on every exit path)
//!    ├── Download {binary}_{version}_{os}_{arch}.tar.gz
//!    ├── Verify against checksums.txt (exact name, fail closed)
//!    └── Extract and locate the binary
//!
//! 3. Apply (not cancellable)
//!    ├── Rename <exe> to <exe>.old
//!    ├── Copy new binary to <exe>, roll back on failure
//!    ├── Remove <exe>.old and the scratch directory
//!    └── exec the new binary (unless --no-restart)
//! ```
//!
//! # Security Considerations
//!
//! - **Derived URLs**: download and checksum URLs are computed from the
//!   resolved version and host platform, never copied from release metadata
//! - **Exact checksum match**: a manifest without a line for the exact
//!   archive name is an error
//! - **Hostile archives**: absolute and `..` entry paths are rejected, file
//!   sizes are capped and only regular files and directories are written
//! - **No retries**: security-relevant failures are reported, never retried
//!
//! # Usage
//!
//! ```bash
//! assistd upgrade --check            # Show available update and changelog
//! assistd upgrade                    # Install latest stable and restart
//! assistd upgrade --channel beta     # Follow the beta track
//! assistd upgrade --no-restart       # Install but keep running the old process
//! assistd upgrade --recover          # Repair an interrupted install
//! ```
//!
//! # Module Structure
//!
//! - [`backup`]: `<exe>.old` handling and crash recovery
//! - [`config`]: the `[upgrade]` table of the global config
//! - [`download`]: streaming downloads with progress callbacks
//! - [`extract`]: tar.gz extraction
//! - [`installer`]: the executable swap and system-managed detection
//! - [`release`]: release and asset metadata, channels
//! - [`resolver`]: release lookup and [`UpdateInfo`] construction
//! - [`restart`]: process replacement
//! - [`self_updater`]: pipeline orchestration
//! - [`verification`]: checksum manifests and SHA-256
//! - [`version`]: lenient version ordering
//! - [`version_check`]: cached update notifications

pub mod backup;
pub mod config;
pub mod download;
pub mod extract;
pub mod installer;
pub mod release;
pub mod resolver;
pub mod restart;
pub mod self_updater;
pub mod verification;
pub mod version;
pub mod version_check;

pub use backup::{BackupManager, Recovery};
pub use config::UpgradeConfig;
pub use download::Downloader;
pub use extract::ArchiveExtractor;
pub use installer::{Installer, is_system_managed};
pub use release::{Asset, Channel, Release};
pub use resolver::{ReleaseResolver, UpdateInfo};
pub use restart::{ExecRestarter, Restarter};
pub use self_updater::{PreparedUpdate, SelfUpdater, UpdateOutcome, build_client};
pub use verification::ChecksumVerifier;
pub use version::{Version, is_newer_version};
pub use version_check::VersionChecker;
