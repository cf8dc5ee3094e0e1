//! Configuration types for ICDB.
//!
//! This crate provides the configuration used by the `icdb` tool, read from
//! `.icdb/config.yaml` files with `ICDB_*` environment overrides.

pub mod env;
pub mod loader;
pub mod types;


pub use env::*;
pub use loader::*;
pub use types::*;
