//! Test utilities for ICDB crates.

use tempfile::TempDir;

pub mod fixtures;
pub mod source;

pub use fixtures::{key_material, signer, RowBuilder};
pub use icdb_crypto::test_keys;
pub use source::MemorySource;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
        assert!(dir.path().is_dir());
    }
}
