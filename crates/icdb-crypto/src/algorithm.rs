//! Registry of the supported signing algorithms.

use crate::error::CryptoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A signing algorithm selectable at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmType {
    /// RSA over SHA-256, per-record verification only.
    Rsa,
    /// RSA over SHA-256 with multiplicative aggregation.
    #[default]
    RsaAggregate,
    /// HMAC-SHA256, per-record verification only.
    Sha,
    /// HMAC-SHA256 with concatenation aggregation.
    ShaAggregate,
}

/// How per-record evidence is folded into a single aggregate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationStrategy {
    /// Codes combine by modular multiplication. Order-independent.
    Multiplicative,
    /// Codes are regenerated and concatenated in row order.
    Recompute,
}

impl AggregationStrategy {
    /// Does the fold depend on row order?
    pub fn is_order_sensitive(self) -> bool {
        matches!(self, Self::Recompute)
    }
}

/// Key family an algorithm draws its material from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Mac,
}

impl AlgorithmType {
    /// Every registered algorithm.
    pub const ALL: [Self; 4] = [Self::Rsa, Self::RsaAggregate, Self::Sha, Self::ShaAggregate];

    /// Aggregation strategy of the algorithm family.
    pub fn strategy(self) -> AggregationStrategy {
        match self {
            Self::Rsa | Self::RsaAggregate => AggregationStrategy::Multiplicative,
            Self::Sha | Self::ShaAggregate => AggregationStrategy::Recompute,
        }
    }

    /// Can queries be verified through the aggregate path?
    pub fn supports_aggregate(self) -> bool {
        matches!(self, Self::RsaAggregate | Self::ShaAggregate)
    }

    /// Key family required to build a signer.
    pub fn key_family(self) -> KeyFamily {
        match self.strategy() {
            AggregationStrategy::Multiplicative => KeyFamily::Rsa,
            AggregationStrategy::Recompute => KeyFamily::Mac,
        }
    }

    /// Configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::RsaAggregate => "rsa_aggregate",
            Self::Sha => "sha",
            Self::ShaAggregate => "sha_aggregate",
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == normalized)
            .ok_or_else(|| CryptoError::UnknownAlgorithm(s.to_string()))
    }
}
