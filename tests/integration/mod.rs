//! Integration test suite for assistd
//!
//! End-to-end tests of the self-update pipeline against a mock GitHub, plus
//! tests of the compiled binary's command line.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! cargo nextest run --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `assistd` binary's argument handling and output
//! - **extraction**: hostile archives and the per-file size cap
//! - **install**: rollback and interrupted-install recovery
//! - **pipeline**: check, download, verify, extract and apply together
//! - **resolver**: channel selection against the releases API

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod install;
mod pipeline;
mod resolver;
