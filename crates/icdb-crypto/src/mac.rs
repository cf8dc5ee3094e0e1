//! Recompute signer: HMAC-SHA256 under a shared secret.

use crate::error::{CryptoError, Result};
use crate::keys::MacKey;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Keyed-hash signer. Verification regenerates the code and compares.
#[derive(Clone)]
pub struct MacSigner {
    keyed: HmacSha256,
}

impl MacSigner {
    pub fn new(key: &MacKey) -> Result<Self> {
        let keyed = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { keyed })
    }

    /// 32-byte code for a message.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.keyed.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time comparison against a stored code.
    pub fn verify(&self, message: &[u8], code: &[u8]) -> bool {
        let mut mac = self.keyed.clone();
        mac.update(message);
        mac.verify_slice(code).is_ok()
    }
}

impl fmt::Debug for MacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MacSigner(<keyed>)")
    }
}
