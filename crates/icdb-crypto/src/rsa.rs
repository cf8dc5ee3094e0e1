//! Multiplicative signer: RSA over a SHA-256 digest reduced modulo N.

use crate::error::{CryptoError, Result};
use crate::keys::RsaKey;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Signs `h(m)^d mod N` and verifies `s^e mod N == h(m) mod N`.
///
/// Because `(a*b)^e = a^e * b^e mod N`, the product of many signatures
/// verifies against the product of their message hashes.
#[derive(Debug, Clone)]
pub struct RsaSigner {
    key: RsaKey,
}

impl RsaSigner {
    pub fn new(key: RsaKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &RsaKey {
        &self.key
    }

    /// SHA-256 digest read as a big-endian integer, reduced mod N.
    pub fn hash_to_int(&self, message: &[u8]) -> BigUint {
        BigUint::from_bytes_be(&Sha256::digest(message)) % self.key.modulus()
    }

    /// Raw signature integer for a message.
    pub fn sign_int(&self, message: &[u8]) -> Result<BigUint> {
        let d = self.key.private_exponent().ok_or(CryptoError::MissingPrivateKey)?;
        Ok(self.hash_to_int(message).modpow(d, self.key.modulus()))
    }

    /// Encoded signature for a message.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.encode(&self.sign_int(message)?))
    }

    /// Check an encoded signature.
    pub fn verify(&self, message: &[u8], code: &[u8]) -> bool {
        match self.decode(code) {
            Ok(signature) => self.recover(&signature) == self.hash_to_int(message),
            Err(_) => false,
        }
    }

    /// `s^e mod N`.
    pub fn recover(&self, signature: &BigUint) -> BigUint {
        signature.modpow(self.key.public_exponent(), self.key.modulus())
    }

    /// Fixed-width big-endian encoding, left-padded to the modulus width.
    pub fn encode(&self, value: &BigUint) -> Vec<u8> {
        let bytes = value.to_bytes_be();
        let width = self.key.byte_len().max(bytes.len());
        let mut out = vec![0u8; width - bytes.len()];
        out.extend_from_slice(&bytes);
        out
    }

    /// Decode a stored signature, rejecting values outside `[0, N)`.
    pub fn decode(&self, code: &[u8]) -> Result<BigUint> {
        if code.is_empty() {
            return Err(CryptoError::InvalidCode("empty signature".into()));
        }
        let value = BigUint::from_bytes_be(code);
        if value >= *self.key.modulus() {
            return Err(CryptoError::InvalidCode("signature not below modulus".into()));
        }
        Ok(value)
    }
}
