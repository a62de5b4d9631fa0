//! Configuration for assistd.
//!
//! Settings live in a single per-user TOML file managed by [`GlobalConfig`].
//! Section types are owned by the modules that consume them, such as
//! [`UpgradeConfig`](crate::upgrade::UpgradeConfig) for the `[upgrade]` table.

mod global;

pub use global::{CONFIG_PATH_ENV, GlobalConfig};
