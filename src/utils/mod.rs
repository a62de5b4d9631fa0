//! Utility modules for assistd
//!
//! Cross-cutting helpers used by the update pipeline and the CLI:
//! - [`fs`]: path cleaning and atomic writes
//! - [`platform`]: host OS/arch identifiers and executable discovery
//! - [`progress`]: download progress bars

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, clean_path};
pub use platform::{arch_identifier, current_executable, is_windows, os_identifier};
pub use progress::ProgressBar;
