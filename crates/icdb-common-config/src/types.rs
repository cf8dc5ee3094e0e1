//! Configuration types.

use icdb_common_core::FetchMode;
use icdb_crypto::AlgorithmType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcdbConfig {
    /// Protected database.
    pub database: DatabaseConfig,
    /// Verification engine settings.
    pub verification: VerificationConfig,
    /// Key material.
    pub keys: KeyConfig,
}

/// Protected database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Connection pool size.
    pub max_connections: u32,
    /// Write-ahead journal, so verification reads never block on a writer.
    pub wal_mode: bool,
    /// How long a statement waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("icdb.sqlite"),
            max_connections: 5,
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

/// Verification engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Signing algorithm in force for every run.
    pub algorithm: AlgorithmType,
    /// Rows of a batch verified in parallel.
    pub workers: usize,
    /// Rows pulled per batch in lazy mode.
    pub fetch_size: usize,
    /// Lazy or eager row fetching.
    pub fetch_mode: FetchMode,
    /// Consult the revocation list while verifying.
    pub validate_icrl: bool,
    /// Revocation list file.
    pub icrl_path: PathBuf,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmType::default(),
            workers: 4,
            fetch_size: 1000,
            fetch_mode: FetchMode::default(),
            validate_icrl: true,
            icrl_path: PathBuf::from("ICRL.txt"),
        }
    }
}

/// Hex-encoded key material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// RSA key for the multiplicative algorithms.
    pub rsa: Option<RsaKeyConfig>,
    /// Secret for the keyed-hash algorithms.
    pub mac_key: Option<String>,
}

/// Hex-encoded RSA components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsaKeyConfig {
    pub modulus: String,
    #[serde(default = "default_public_exponent")]
    pub public_exponent: String,
    /// Only needed to issue codes.
    #[serde(default)]
    pub private_exponent: Option<String>,
}

fn default_public_exponent() -> String {
    "10001".to_string()
}
