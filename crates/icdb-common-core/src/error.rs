//! Error types for the storage collaborator.

use thiserror::Error;

/// Errors raised by the protected store.
///
/// These are fatal for the run that hit them; the verifier never retries.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query could not be run (syntax, constraint, I/O).
    #[error("query failed: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A column type the engine cannot represent.
    #[error("unsupported type `{type_name}` in column `{column}`")]
    UnsupportedType { column: String, type_name: String },
}

impl StoreError {
    /// Create a query error without a source.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
