//! CLI error type and exit codes.

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

use icdb_common_config::ConfigError;
use icdb_crypto::CryptoError;
use icdb_database::PoolError;
use icdb_icrl::IcrlError;
use icdb_verify::VerifyError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid query file {path}: {message}")]
    QueryFile { path: PathBuf, message: String },

    #[error("database error: {0}")]
    Database(#[from] PoolError),

    #[error("revocation list error: {0}")]
    Icrl(#[from] IcrlError),

    #[error("{0}")]
    Crypto(#[from] CryptoError),

    #[error("{0}")]
    Verify(#[from] VerifyError),

    /// The query ran into tampered or revoked data.
    #[error("verification failed for {failed} of {records} records")]
    Rejected { records: usize, failed: usize },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E001",
            Self::Io { .. } => "E002",
            Self::QueryFile { .. } => "E003",
            Self::Database(_) => "E004",
            Self::Icrl(_) => "E005",
            Self::Crypto(_) => "E006",
            Self::Verify(_) => "E007",
            Self::Rejected { .. } => "E008",
            Self::Other(_) => "E999",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            Self::Config(_) => 2,
            Self::Io { .. } => 3,
            Self::QueryFile { .. } => 5,
            Self::Database(_) | Self::Verify(_) => 6,
            Self::Icrl(_) => 7,
            Self::Rejected { .. } => 4,
            Self::Crypto(_) | Self::Other(_) => 1,
        };
        ExitCode::from(code)
    }
}
