//! Errors raised while signing or checking integrity codes.

use crate::algorithm::{AggregationStrategy, AlgorithmType};
use thiserror::Error;

/// Crypto errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("no key material configured for {algorithm}")]
    MissingKey { algorithm: AlgorithmType },

    #[error("signing requires the private exponent")]
    MissingPrivateKey,

    #[error("invalid integrity code: {0}")]
    InvalidCode(String),

    #[error("accumulator does not belong to the {expected:?} strategy")]
    StrategyMismatch { expected: AggregationStrategy },
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
