//! Hashing and comparison helpers shared by the prover, verifier and codec

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// base64url (no padding) of SHA-256 over `data`
///
/// This is the `ath` construction of RFC 9449 and the digest step of
/// RFC 7638 thumbprints.
#[must_use]
pub fn sha256_b64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(data))
}

/// Constant-time string comparison to prevent timing attacks
///
/// Uses the `subtle` crate so the comparison time does not depend on where
/// the first differing byte sits.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
