//! File system helpers.
//!
//! - [`paths`]: lexical cleaning of untrusted paths
//! - [`atomic`]: temp-and-rename writes for state files

pub mod atomic;
pub mod paths;

pub use atomic::atomic_write;
pub use paths::{clean_path, escapes_base};
