//! Accumulators folding per-record evidence into one aggregate check.
//!
//! Accumulators are built per worker chunk and merged in chunk order, so
//! `merge(a, b)` always means "`a` came before `b`".

use crate::algorithm::AggregationStrategy;
use crate::error::{CryptoError, Result};
use num_bigint::BigUint;
use num_traits::One;

/// Running product of message hashes modulo N. Commutative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAccumulator {
    modulus: BigUint,
    product: BigUint,
    count: usize,
}

impl ProductAccumulator {
    /// Identity accumulator (product 1).
    pub fn new(modulus: BigUint) -> Self {
        Self {
            modulus,
            product: BigUint::one(),
            count: 0,
        }
    }

    pub fn absorb(&mut self, value: &BigUint) {
        self.product = &self.product * value % &self.modulus;
        self.count += 1;
    }

    pub fn merge(&mut self, other: ProductAccumulator) {
        self.product = &self.product * other.product % &self.modulus;
        self.count += other.count;
    }

    pub fn product(&self) -> &BigUint {
        &self.product
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Lowercase hex concatenation of regenerated codes. Order-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcatAccumulator {
    digest: String,
    count: usize,
}

impl ConcatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, code: &[u8]) {
        self.digest.push_str(&hex::encode(code));
        self.count += 1;
    }

    /// Append a later chunk.
    pub fn merge(&mut self, later: ConcatAccumulator) {
        self.digest.push_str(&later.digest);
        self.count += later.count;
    }

    pub fn as_str(&self) -> &str {
        &self.digest
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Computed aggregate for one verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    Product(ProductAccumulator),
    Concat(ConcatAccumulator),
}

impl Accumulator {
    pub fn strategy(&self) -> AggregationStrategy {
        match self {
            Self::Product(_) => AggregationStrategy::Multiplicative,
            Self::Concat(_) => AggregationStrategy::Recompute,
        }
    }

    /// Records folded so far.
    pub fn count(&self) -> usize {
        match self {
            Self::Product(acc) => acc.count(),
            Self::Concat(acc) => acc.count(),
        }
    }

    /// Fold a later accumulator of the same strategy into this one.
    pub fn merge(&mut self, later: Accumulator) -> Result<()> {
        match (self, later) {
            (Self::Product(acc), Self::Product(other)) => acc.merge(other),
            (Self::Concat(acc), Self::Concat(other)) => acc.merge(other),
            (this, _) => {
                return Err(CryptoError::StrategyMismatch {
                    expected: this.strategy(),
                })
            }
        }
        Ok(())
    }
}

/// Expected aggregate code as supplied by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateCode {
    /// Product of the stored signatures modulo N.
    Signature(BigUint),
    /// Lowercase hex concatenation of the stored codes.
    Digest(String),
}
