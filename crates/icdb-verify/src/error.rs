//! Run-level verification errors.

use icdb_common_core::StoreError;
use icdb_crypto::CryptoError;
use thiserror::Error;

/// Errors that end a verification run.
///
/// Per-record failures are not errors: they are collected in the
/// [`VerificationReport`](crate::VerificationReport).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("execution refused: the query has not been verified")]
    NotVerified,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("malformed expected aggregate: {0}")]
    Aggregate(String),

    #[error("verification worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result type for verification.
pub type Result<T> = std::result::Result<T, VerifyError>;
