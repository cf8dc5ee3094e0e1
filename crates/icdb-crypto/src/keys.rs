//! Key material for the signer families.

use crate::error::{CryptoError, Result};
use num_bigint::BigUint;
use num_traits::One;
use std::fmt;
use zeroize::Zeroizing;

fn parse_hex(label: &str, text: &str) -> Result<BigUint> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.is_empty() {
        return Err(CryptoError::InvalidKey(format!("{label} is empty")));
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| CryptoError::InvalidKey(format!("{label} is not hexadecimal")))
}

/// RSA modulus and exponents.
///
/// The private exponent is optional: a verifier only needs `(N, e)`.
#[derive(Clone)]
pub struct RsaKey {
    modulus: BigUint,
    public_exponent: BigUint,
    private_exponent: Option<BigUint>,
}

impl RsaKey {
    /// Build a key, rejecting degenerate moduli and exponents.
    pub fn new(
        modulus: BigUint,
        public_exponent: BigUint,
        private_exponent: Option<BigUint>,
    ) -> Result<Self> {
        let one = BigUint::one();
        if modulus <= one {
            return Err(CryptoError::InvalidKey("modulus must exceed 1".into()));
        }
        if public_exponent <= one {
            return Err(CryptoError::InvalidKey("public exponent must exceed 1".into()));
        }
        if matches!(&private_exponent, Some(d) if *d <= one) {
            return Err(CryptoError::InvalidKey("private exponent must exceed 1".into()));
        }
        Ok(Self {
            modulus,
            public_exponent,
            private_exponent,
        })
    }

    /// Parse hex-encoded components (an optional `0x` prefix is accepted).
    pub fn from_hex(modulus: &str, public_exponent: &str, private_exponent: Option<&str>) -> Result<Self> {
        let private_exponent = private_exponent
            .map(|d| parse_hex("private exponent", d))
            .transpose()?;
        Self::new(
            parse_hex("modulus", modulus)?,
            parse_hex("public exponent", public_exponent)?,
            private_exponent,
        )
    }

    /// Copy of the key without the private exponent.
    pub fn public_only(&self) -> Self {
        Self {
            modulus: self.modulus.clone(),
            public_exponent: self.public_exponent.clone(),
            private_exponent: None,
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn public_exponent(&self) -> &BigUint {
        &self.public_exponent
    }

    pub fn private_exponent(&self) -> Option<&BigUint> {
        self.private_exponent.as_ref()
    }

    /// Can this key produce signatures?
    pub fn can_sign(&self) -> bool {
        self.private_exponent.is_some()
    }

    /// Width in bytes of an encoded signature.
    pub fn byte_len(&self) -> usize {
        ((self.modulus.bits() + 7) / 8) as usize
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("bits", &self.modulus.bits())
            .field("public_exponent", &self.public_exponent)
            .field("private_exponent", &self.private_exponent.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Secret key for the keyed-hash family. Wiped on drop.
#[derive(Clone)]
pub struct MacKey(Zeroizing<Vec<u8>>);

impl MacKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CryptoError::InvalidKey("MAC key is empty".into()));
        }
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("MAC key: {e}")))?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacKey(<{} bytes>)", self.0.len())
    }
}

/// Key material available to the signer registry.
#[derive(Debug, Clone, Default)]
pub struct KeyMaterial {
    pub rsa: Option<RsaKey>,
    pub mac: Option<MacKey>,
}

impl KeyMaterial {
    pub fn with_rsa(mut self, key: RsaKey) -> Self {
        self.rsa = Some(key);
        self
    }

    pub fn with_mac(mut self, key: MacKey) -> Self {
        self.mac = Some(key);
        self
    }
}
