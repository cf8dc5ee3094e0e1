//! Algorithm-selected signer with its aggregation behavior.

use crate::aggregate::{Accumulator, AggregateCode, ConcatAccumulator, ProductAccumulator};
use crate::algorithm::{AggregationStrategy, AlgorithmType, KeyFamily};
use crate::error::{CryptoError, Result};
use crate::keys::KeyMaterial;
use crate::mac::MacSigner;
use crate::rsa::RsaSigner;
use num_bigint::BigUint;
use num_traits::One;

/// A signer selected by [`AlgorithmType`].
///
/// Signers are immutable after construction and safe to share across
/// workers behind an `Arc`.
#[derive(Debug, Clone)]
pub enum Signer {
    Rsa(RsaSigner),
    Mac(MacSigner),
}

impl Signer {
    /// Build the signer for an algorithm from the available key material.
    pub fn for_algorithm(algorithm: AlgorithmType, keys: &KeyMaterial) -> Result<Self> {
        match algorithm.key_family() {
            KeyFamily::Rsa => keys
                .rsa
                .clone()
                .map(|key| Self::Rsa(RsaSigner::new(key)))
                .ok_or(CryptoError::MissingKey { algorithm }),
            KeyFamily::Mac => {
                let key = keys.mac.as_ref().ok_or(CryptoError::MissingKey { algorithm })?;
                Ok(Self::Mac(MacSigner::new(key)?))
            }
        }
    }

    pub fn strategy(&self) -> AggregationStrategy {
        match self {
            Self::Rsa(_) => AggregationStrategy::Multiplicative,
            Self::Mac(_) => AggregationStrategy::Recompute,
        }
    }

    /// Produce the integrity code for a canonical message.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Rsa(signer) => signer.sign(message),
            Self::Mac(signer) => Ok(signer.sign(message)),
        }
    }

    /// Check a stored code against a canonical message. Never errors: any
    /// malformed code is simply a mismatch.
    pub fn verify(&self, message: &[u8], code: &[u8]) -> bool {
        match self {
            Self::Rsa(signer) => signer.verify(message, code),
            Self::Mac(signer) => signer.verify(message, code),
        }
    }

    /// Identity accumulator for this signer's strategy.
    pub fn accumulator(&self) -> Accumulator {
        match self {
            Self::Rsa(signer) => {
                Accumulator::Product(ProductAccumulator::new(signer.key().modulus().clone()))
            }
            Self::Mac(_) => Accumulator::Concat(ConcatAccumulator::new()),
        }
    }

    /// Fold one record's canonical message into an accumulator.
    pub fn absorb(&self, accumulator: &mut Accumulator, message: &[u8]) -> Result<()> {
        match (self, accumulator) {
            (Self::Rsa(signer), Accumulator::Product(acc)) => {
                acc.absorb(&signer.hash_to_int(message));
                Ok(())
            }
            (Self::Mac(signer), Accumulator::Concat(acc)) => {
                acc.absorb(&signer.sign(message));
                Ok(())
            }
            _ => Err(CryptoError::StrategyMismatch {
                expected: self.strategy(),
            }),
        }
    }

    /// Combine the codes returned by an aggregate query, in row order, into
    /// the expected aggregate.
    pub fn combine_codes<I, C>(&self, codes: I) -> Result<AggregateCode>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        match self {
            Self::Rsa(signer) => {
                let modulus = signer.key().modulus();
                let mut product = BigUint::one();
                for code in codes {
                    product = product * signer.decode(code.as_ref())? % modulus;
                }
                Ok(AggregateCode::Signature(product))
            }
            Self::Mac(_) => {
                let digest = codes.into_iter().map(hex::encode).collect();
                Ok(AggregateCode::Digest(digest))
            }
        }
    }

    /// Does the computed accumulator match the expected aggregate?
    pub fn check_aggregate(&self, computed: &Accumulator, expected: &AggregateCode) -> bool {
        match (self, computed, expected) {
            (Self::Rsa(signer), Accumulator::Product(acc), AggregateCode::Signature(signature)) => {
                signer.recover(signature) == *acc.product()
            }
            (Self::Mac(_), Accumulator::Concat(acc), AggregateCode::Digest(digest)) => {
                acc.as_str().eq_ignore_ascii_case(digest)
            }
            _ => false,
        }
    }

    /// Issue an aggregate code covering several messages at once.
    pub fn sign_aggregate<I, M>(&self, messages: I) -> Result<AggregateCode>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<[u8]>,
    {
        let codes = messages
            .into_iter()
            .map(|message| self.sign(message.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.combine_codes(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::canonical_message;
    use crate::test_keys;
    use icdb_common_core::Serial;
    use proptest::prelude::*;

    fn rsa() -> Signer {
        Signer::for_algorithm(AlgorithmType::RsaAggregate, &test_keys::key_material()).unwrap()
    }

    fn mac() -> Signer {
        Signer::for_algorithm(AlgorithmType::ShaAggregate, &test_keys::key_material()).unwrap()
    }

    fn fold(signer: &Signer, messages: &[Vec<u8>]) -> Accumulator {
        let mut acc = signer.accumulator();
        for message in messages {
            signer.absorb(&mut acc, message).unwrap();
        }
        acc
    }

    #[test]
    fn test_missing_key_material() {
        let err = Signer::for_algorithm(AlgorithmType::Rsa, &KeyMaterial::default()).unwrap_err();
        assert!(matches!(err, CryptoError::MissingKey { algorithm: AlgorithmType::Rsa }));
        let err = Signer::for_algorithm(AlgorithmType::Sha, &KeyMaterial::default()).unwrap_err();
        assert!(matches!(err, CryptoError::MissingKey { algorithm: AlgorithmType::Sha }));
    }

    #[test]
    fn test_strategy_follows_family() {
        assert_eq!(rsa().strategy(), AggregationStrategy::Multiplicative);
        assert_eq!(mac().strategy(), AggregationStrategy::Recompute);
    }

    #[test]
    fn test_empty_aggregate_is_identity() {
        for signer in [rsa(), mac()] {
            let expected = signer.combine_codes(Vec::<Vec<u8>>::new()).unwrap();
            assert!(signer.check_aggregate(&signer.accumulator(), &expected));
        }
    }

    #[test]
    fn test_rsa_aggregate_is_order_independent() {
        let signer = rsa();
        let messages: Vec<Vec<u8>> = (1..=4)
            .map(|i| canonical_message(&format!("row{i}employees"), Serial(i)))
            .collect();
        let expected = signer.sign_aggregate(&messages).unwrap();

        let mut reversed = messages.clone();
        reversed.reverse();
        assert!(signer.check_aggregate(&fold(&signer, &reversed), &expected));
    }

    #[test]
    fn test_mac_aggregate_is_order_sensitive() {
        let signer = mac();
        let messages = vec![b"first".to_vec(), b"second".to_vec()];
        let expected = signer.sign_aggregate(&messages).unwrap();
        assert!(signer.check_aggregate(&fold(&signer, &messages), &expected));

        let reversed = vec![b"second".to_vec(), b"first".to_vec()];
        assert!(!signer.check_aggregate(&fold(&signer, &reversed), &expected));
    }

    #[test]
    fn test_aggregate_detects_dropped_record() {
        for signer in [rsa(), mac()] {
            let messages = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
            let expected = signer.sign_aggregate(&messages).unwrap();
            assert!(!signer.check_aggregate(&fold(&signer, &messages[..2]), &expected));
        }
    }

    #[test]
    fn test_merged_chunks_match_single_fold() {
        for signer in [rsa(), mac()] {
            let messages: Vec<Vec<u8>> = (0..6u8).map(|i| vec![i; 3]).collect();
            let expected = signer.sign_aggregate(&messages).unwrap();

            let mut merged = fold(&signer, &messages[..2]);
            merged.merge(fold(&signer, &messages[2..5])).unwrap();
            merged.merge(fold(&signer, &messages[5..])).unwrap();
            assert_eq!(merged.count(), 6);
            assert!(signer.check_aggregate(&merged, &expected));
        }
    }

    #[test]
    fn test_mismatched_accumulator_rejected() {
        let mut acc = mac().accumulator();
        assert!(rsa().absorb(&mut acc, b"m").is_err());
        let expected = rsa().combine_codes(Vec::<Vec<u8>>::new()).unwrap();
        assert!(!mac().check_aggregate(&mac().accumulator(), &expected));
    }

    #[test]
    fn test_rsa_combine_rejects_out_of_range_code() {
        let signer = rsa();
        let Signer::Rsa(inner) = &signer else { unreachable!() };
        let bad = inner.key().modulus().to_bytes_be();
        assert!(matches!(signer.combine_codes([bad]), Err(CryptoError::InvalidCode(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_sign_verify_round_trip(payload in ".{0,40}", serial in any::<u64>()) {
            let message = canonical_message(&payload, Serial(serial));
            for signer in [rsa(), mac()] {
                let code = signer.sign(&message).unwrap();
                prop_assert!(signer.verify(&message, &code));
            }
        }

        #[test]
        fn prop_serial_change_detected(payload in "[a-z]{1,20}", serial in 0u64..u64::MAX) {
            let message = canonical_message(&payload, Serial(serial));
            let moved = canonical_message(&payload, Serial(serial + 1));
            for signer in [rsa(), mac()] {
                let code = signer.sign(&message).unwrap();
                prop_assert!(!signer.verify(&moved, &code));
            }
        }

        #[test]
        fn prop_code_byte_flip_detected(payload in "[a-z]{1,20}", index in any::<prop::sample::Index>()) {
            let message = canonical_message(&payload, Serial(1));
            for signer in [rsa(), mac()] {
                let mut code = signer.sign(&message).unwrap();
                let i = index.index(code.len());
                code[i] ^= 0x01;
                prop_assert!(!signer.verify(&message, &code));
            }
        }
    }
}
