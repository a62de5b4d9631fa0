//! Platform identification and executable discovery
//!
//! Release archives are named after the host platform using Go-style
//! identifiers (`linux`, `darwin`, `windows` / `amd64`, `arm64`), which is
//! what the release tooling publishes. The helpers here map Rust's
//! `std::env::consts` values onto those identifiers.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Operating system identifier used in release archive names.
///
/// # Examples
///
/// ```rust
/// use assistd::utils::platform::os_identifier;
///
/// #[cfg(target_os = "macos")]
/// assert_eq!(os_identifier(), "darwin");
/// #[cfg(target_os = "linux")]
/// assert_eq!(os_identifier(), "linux");
/// ```
#[must_use]
pub fn os_identifier() -> &'static str {
    map_os(std::env::consts::OS)
}

/// CPU architecture identifier used in release archive names.
#[must_use]
pub fn arch_identifier() -> &'static str {
    map_arch(std::env::consts::ARCH)
}

fn map_os(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn map_arch(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        other => other,
    }
}

/// File name of the executable inside a release archive on this platform.
#[must_use]
pub fn binary_file_name(binary: &str) -> String {
    if is_windows() {
        format!("{binary}.exe")
    } else {
        binary.to_string()
    }
}

/// Resolve the path of the running executable with all symlinks followed.
///
/// # Errors
///
/// Fails if the OS cannot report the executable path or it cannot be
/// canonicalized (for example because it was deleted while running).
pub fn current_executable() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to get current executable path")?;
    std::fs::canonicalize(&exe)
        .with_context(|| format!("Failed to resolve executable path {}", exe.display()))
}
