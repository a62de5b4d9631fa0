//! Error handling for the assistd self-update pipeline
//!
//! Every stage of the update pipeline (resolve, download, verify, extract,
//! install, restart) reports failures through a single strongly-typed enum,
//! [`UpdateError`]. The CLI layer wraps these in `anyhow` with extra context and
//! turns them into an [`ErrorContext`] for display.
//!
//! # Error Categories
//!
//! - **Release discovery**: [`UpdateError::Network`], [`UpdateError::HttpStatus`],
//!   [`UpdateError::NoReleasesFound`], [`UpdateError::NoMatchingRelease`],
//!   [`UpdateError::UnknownChannel`], [`UpdateError::Decode`]
//! - **Trust boundary**: [`UpdateError::ChecksumNotFound`], [`UpdateError::ChecksumMismatch`]
//! - **Unpacking**: [`UpdateError::PathTraversal`], [`UpdateError::BinaryMissing`]
//! - **Installation**: [`UpdateError::InstallIo`], [`UpdateError::Restart`]
//! - **Scratch I/O**: [`UpdateError::FileSystem`]
//!
//! Callers that only need to branch on the category (for example to print
//! "nothing to update to" instead of "network failure") should use
//! [`UpdateError::kind`] rather than matching on message text.
//!
//! # Examples
//!
//! ```rust,no_run
//! use assistd::core::{ErrorKind, UpdateError, user_friendly_error};
//!
//! let err = UpdateError::NoReleasesFound {
//!     channel: "stable".to_string(),
//! };
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//!
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::io;
use thiserror::Error;

/// Number of hex characters kept when a digest is shown in an error message.
const DIGEST_DISPLAY_LEN: usize = 16;

/// Coarse classification of an [`UpdateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request or transport failure, including unexpected HTTP status codes.
    Network,
    /// No release exists for the requested channel.
    NotFound,
    /// The caller asked for something that cannot be resolved (e.g. an unknown channel).
    InvalidInput,
    /// Malformed JSON or manifest payload.
    Decode,
    /// The checksum manifest has no entry for the archive.
    ChecksumNotFound,
    /// The archive digest differs from the manifest.
    ChecksumMismatch,
    /// An archive entry tried to escape the extraction directory.
    PathTraversal,
    /// Extraction finished but the executable was not in the archive.
    BinaryMissing,
    /// Filesystem failure while swapping the executable.
    InstallIo,
    /// Replacing the process image failed.
    Restart,
    /// Filesystem failure in the scratch directory.
    FileSystem,
}

/// Errors produced by the self-update pipeline.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The HTTP request could not be completed.
    #[error("Network error while {operation} ({url}): {reason}")]
    Network {
        operation: String,
        url: String,
        reason: String,
    },

    /// The server answered with a non-success status code.
    #[error("Unexpected HTTP status {status} while {operation} ({url})")]
    HttpStatus {
        operation: String,
        url: String,
        status: u16,
    },

    /// The release endpoint returned 404 for the stable channel.
    #[error("No releases found for channel '{channel}'")]
    NoReleasesFound {
        channel: String,
    },

    /// The release list had no non-draft entry for a pre-release channel.
    #[error("No release found matching channel '{channel}'")]
    NoMatchingRelease {
        channel: String,
    },

    #[error("Unknown release channel '{channel}' (expected stable, beta or rc)")]
    UnknownChannel {
        channel: String,
    },

    /// A JSON or text payload could not be decoded.
    #[error("Failed to decode {what}: {reason}")]
    Decode {
        what: String,
        reason: String,
    },

    #[error("Checksum not found for '{archive}' in {manifest_url}")]
    ChecksumNotFound {
        archive: String,
        manifest_url: String,
    },

    #[error(
        "Checksum mismatch for '{archive}': expected {}, got {}",
        truncate_digest(.expected),
        truncate_digest(.actual)
    )]
    ChecksumMismatch {
        archive: String,
        expected: String,
        actual: String,
    },

    /// An archive entry resolves outside the extraction directory.
    #[error("Archive entry '{entry}' escapes the extraction directory")]
    PathTraversal {
        entry: String,
    },

    #[error("Binary '{binary}' not found in archive (extracted to {dir})")]
    BinaryMissing {
        binary: String,
        dir: String,
    },

    /// Filesystem failure while swapping the running executable.
    #[error("Install failed to {operation} {path}: {source}")]
    InstallIo {
        operation: String,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to restart into {path}: {source}")]
    Restart {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Filesystem failure while writing scratch files (downloads, extraction).
    #[error("File system error while {operation} {path}: {source}")]
    FileSystem {
        operation: String,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl UpdateError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network {
                ..
            }
            | Self::HttpStatus {
                ..
            } => ErrorKind::Network,
            Self::NoReleasesFound {
                ..
            }
            | Self::NoMatchingRelease {
                ..
            } => ErrorKind::NotFound,
            Self::UnknownChannel {
                ..
            } => ErrorKind::InvalidInput,
            Self::Decode {
                ..
            } => ErrorKind::Decode,
            Self::ChecksumNotFound {
                ..
            } => ErrorKind::ChecksumNotFound,
            Self::ChecksumMismatch {
                ..
            } => ErrorKind::ChecksumMismatch,
            Self::PathTraversal {
                ..
            } => ErrorKind::PathTraversal,
            Self::BinaryMissing {
                ..
            } => ErrorKind::BinaryMissing,
            Self::InstallIo {
                ..
            } => ErrorKind::InstallIo,
            Self::Restart {
                ..
            } => ErrorKind::Restart,
            Self::FileSystem {
                ..
            } => ErrorKind::FileSystem,
        }
    }

    /// Build a [`UpdateError::Network`] from a transport error.
    pub fn network(operation: impl Into<String>, url: &str, err: &reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    /// Build a [`UpdateError::FileSystem`] for a scratch-directory operation.
    pub fn fs(operation: impl Into<String>, path: &std::path::Path, source: io::Error) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.display().to_string(),
            source,
        }
    }

    /// Build a [`UpdateError::InstallIo`] for a step of the binary swap.
    pub fn install(operation: impl Into<String>, path: &std::path::Path, source: io::Error) -> Self {
        Self::InstallIo {
            operation: operation.into(),
            path: path.display().to_string(),
            source,
        }
    }
}

fn truncate_digest(digest: &str) -> String {
    match digest.get(..DIGEST_DISPLAY_LEN) {
        Some(prefix) if digest.len() > DIGEST_DISPLAY_LEN => format!("{prefix}..."),
        _ => digest.to_string(),
    }
}

/// An error message enriched with details and a suggested next step.
///
/// This is what the CLI prints when a command fails. The `error` line is the
/// original message; `details` and `suggestion` are optional and only shown
/// when present.
#[derive(Debug)]
pub struct ErrorContext {
    pub message: String,
    pub kind: Option<ErrorKind>,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for terminal output.
///
/// If the chain contains an [`UpdateError`], a category-specific suggestion is
/// attached. Otherwise the full cause chain is rendered into the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = render_chain(&error);

    if let Some(update_error) = error.chain().find_map(|e| e.downcast_ref::<UpdateError>()) {
        return create_error_context(message, update_error);
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<io::Error>())
        && io_error.kind() == io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(message)
            .with_kind(ErrorKind::InstallIo)
            .with_suggestion(
                "Try running with elevated permissions (sudo/Administrator) or check file ownership",
            );
    }

    ErrorContext::new(message)
}

fn render_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}

fn create_error_context(message: String, error: &UpdateError) -> ErrorContext {
    let ctx = ErrorContext::new(message).with_kind(error.kind());

    match error {
        UpdateError::Network {
            ..
        }
        | UpdateError::HttpStatus {
            ..
        } => ctx
            .with_suggestion("Check your internet connection and try again")
            .with_details("The release server could not be reached or returned an unexpected response"),

        UpdateError::NoReleasesFound {
            channel,
        }
        | UpdateError::NoMatchingRelease {
            channel,
        } => ctx
            .with_suggestion(format!(
                "Nothing to update to on the '{channel}' channel. Try another channel with --channel"
            )),

        UpdateError::UnknownChannel {
            ..
        } => ctx.with_suggestion("Use one of: stable, beta, rc"),

        UpdateError::Decode {
            ..
        } => ctx.with_details("The release server returned a payload that could not be parsed"),

        UpdateError::ChecksumNotFound {
            archive,
            ..
        } => ctx
            .with_suggestion("No build for this platform may exist in the release")
            .with_details(format!(
                "The release checksum manifest has no entry named '{archive}'; the update was not installed"
            )),

        UpdateError::ChecksumMismatch {
            ..
        } => ctx
            .with_suggestion("Retry the upgrade later. If it persists, report it to the maintainers")
            .with_details("The downloaded archive does not match the published checksum; it was discarded"),

        UpdateError::PathTraversal {
            ..
        } => ctx.with_details(
            "The release archive contains an unsafe path and was rejected; nothing was installed",
        ),

        UpdateError::BinaryMissing {
            ..
        } => ctx.with_details("The release archive does not contain the expected executable"),

        UpdateError::InstallIo {
            ..
        } => ctx
            .with_suggestion(match cfg!(windows) {
                true => "Run as Administrator or check file permissions in File Explorer",
                false => "Use 'sudo' or check file permissions with 'ls -la'",
            })
            .with_details("The previous binary was kept in place"),

        UpdateError::Restart {
            ..
        } => ctx
            .with_suggestion("The new version is installed; start assistd again manually"),

        UpdateError::FileSystem {
            ..
        } => ctx.with_suggestion("Check free disk space in the temporary directory"),
    }
}
