//! Test utilities for assistd
//!
//! Shared by the unit tests and, through the `test-utils` feature, by the
//! integration suite.
//!
//! - [`init_test_logging`] wires `tracing` output into the test harness
//! - [`fixtures`] builds release archives and checksum manifests, including
//!   deliberately hostile ones

pub mod fixtures;

pub use fixtures::{ArchiveBuilder, checksum_manifest, sha256_hex};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` unset, logging is enabled
/// only if `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=assistd=debug cargo test --test integration
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
