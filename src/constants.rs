//! Global constants used throughout the assistd codebase.
//!
//! Timeout durations, size limits and naming conventions that are shared
//! between the update pipeline stages and the CLI. Values that users may want
//! to change are also exposed through [`crate::upgrade::config::UpgradeConfig`];
//! the constants here are the defaults.

use std::time::Duration;

/// Application name used in archive names and the default binary name.
pub const APP_NAME: &str = "assistd";

/// `User-Agent` sent with every request to the release server.
pub const USER_AGENT: &str = concat!("assistd/", env!("CARGO_PKG_VERSION"));

/// `Accept` header required by the GitHub REST API v3.
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

pub const DEFAULT_RELEASES_BASE: &str = "https://github.com";

pub const DEFAULT_REPO_OWNER: &str = "assistd";

pub const DEFAULT_REPO_NAME: &str = "assistd";

/// Name of the checksum manifest published alongside every release.
pub const CHECKSUM_MANIFEST_NAME: &str = "checksums.txt";

/// Timeout for small JSON/text metadata requests.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for archive downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Per-file ceiling applied while extracting archive entries (100 MiB).
pub const MAX_EXTRACT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Buffer size for streaming hashes and bounded copies.
pub const IO_CHUNK_SIZE: usize = 64 * 1024;

/// Suffix appended to the executable path while an install is in progress.
pub const BACKUP_SUFFIX: &str = ".old";
