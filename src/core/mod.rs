//! Core types shared by every stage of the self-update pipeline.
//!
//! At the moment this is the error system:
//! - [`UpdateError`] - strongly-typed failures with operation and path/URL context
//! - [`ErrorKind`] - coarse category for branching without string matching
//! - [`ErrorContext`] / [`user_friendly_error`] - terminal rendering with suggestions
//!
//! # Examples
//!
//! ```rust
//! use assistd::core::{ErrorKind, UpdateError};
//!
//! fn resolve(channel: &str) -> Result<(), UpdateError> {
//!     Err(UpdateError::UnknownChannel {
//!         channel: channel.to_string(),
//!     })
//! }
//!
//! let err = resolve("nightly").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidInput);
//! ```

pub mod error;

pub use error::{ErrorContext, ErrorKind, UpdateError, user_friendly_error};
