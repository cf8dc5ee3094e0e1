//! Integrity codes for ICDB.
//!
//! Every record (or row group) in the protected store carries an integrity
//! code bound to a serial number. This crate holds the algorithm registry,
//! the two signer families and the accumulators used to check a whole result
//! set with a single aggregate comparison:
//!
//! - RSA over SHA-256 (multiplicative): signatures multiply, so the product
//!   of stored signatures verifies against the product of message hashes.
//! - HMAC-SHA256 (recompute): codes are regenerated and concatenated in row
//!   order, then compared with the concatenation the store returns.

mod aggregate;
mod algorithm;
mod codegen;
mod error;
mod keys;
mod mac;
mod message;
mod rsa;
mod signer;

#[cfg(any(test, feature = "test-keys"))]
pub mod test_keys;

pub use aggregate::{Accumulator, AggregateCode, ConcatAccumulator, ProductAccumulator};
pub use algorithm::{AggregationStrategy, AlgorithmType, KeyFamily};
pub use codegen::{CodeGen, IssuedCode, SerialIssuer};
pub use error::{CryptoError, Result};
pub use keys::{KeyMaterial, MacKey, RsaKey};
pub use mac::MacSigner;
pub use message::{canonical_message, canonical_payload};
pub use rsa::RsaSigner;
pub use signer::Signer;
