//! Fixed, publicly known keys for tests and fixtures.

use crate::keys::{KeyMaterial, MacKey, RsaKey};

/// 1024-bit test modulus.
pub const RSA_MODULUS: &str = "91ea1ce22625fe423a780fb8e71a4d18386b04d1a6af6f482b362dd41b582b5b78e2c48d84c77c443896698e3f7856fe497e728eb85f350319f8f5debfc6aa34f0c0c04614800e22bfbe92e75487eaa1a2ffa210af59e77736b27c685a4260dc06b89fcd1d458f016b566a6621f5eb36fda927ecee4550c0a3855a3c088bfad5";

pub const RSA_PUBLIC_EXPONENT: &str = "10001";

pub const RSA_PRIVATE_EXPONENT: &str = "5330ec38cfd1378ea0f154dd71fd9fd8e049bbdca03143bc1cceee00117b0a75438ddecc64d8ab73e5e373d9233cc43484c8701e08e6573e266fb816c0b64ed1b494c1b1a6f85161b3543d3d08c01b49175cfc3782ba5cfc96560d976e4125425d4025d19e49ef2ba68c2da8a64f824d055a85549716c2f674be03dd960f04c1";

pub const MAC_KEY: &str = "6963646220746573742073656372657420ffeeddccbbaa99887766554433221100";

/// RSA key including the private exponent.
pub fn rsa_key() -> RsaKey {
    match RsaKey::from_hex(RSA_MODULUS, RSA_PUBLIC_EXPONENT, Some(RSA_PRIVATE_EXPONENT)) {
        Ok(key) => key,
        Err(e) => panic!("test RSA key is malformed: {e}"),
    }
}

pub fn mac_key() -> MacKey {
    match MacKey::from_hex(MAC_KEY) {
        Ok(key) => key,
        Err(e) => panic!("test MAC key is malformed: {e}"),
    }
}

/// Both key families.
pub fn key_material() -> KeyMaterial {
    KeyMaterial::default().with_rsa(rsa_key()).with_mac(mac_key())
}
