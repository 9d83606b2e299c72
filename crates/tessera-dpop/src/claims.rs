//! Proof claims and key confirmation

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use tessera_core::{EntropySource, Result, random_array, sha256_b64url};

/// Number of random bytes behind a JTI (encodes to 22 base64url characters)
pub const JTI_BYTES: usize = 16;

/// DPoP proof JWT payload as defined in RFC 9449
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofClaims {
    /// JWT ID - unique identifier for replay prevention
    pub jti: String,

    /// HTTP method being bound to this proof
    pub htm: String,

    /// HTTP URI being bound to this proof (without query/fragment)
    pub htu: String,

    /// Issued at timestamp (Unix seconds)
    pub iat: i64,

    /// Access token hash (when binding to an access token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ath: Option<String>,
}

/// Key confirmation (`cnf`) produced by a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// base64url SHA-256 JWK thumbprint of the proof key
    pub jkt: String,
}

/// Generate a fresh JTI from `entropy`
///
/// # Errors
/// Propagates [`tessera_core::Error::Entropy`]
pub fn generate_jti(entropy: &dyn EntropySource) -> Result<String> {
    let bytes: [u8; JTI_BYTES] = random_array(entropy)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compute the `ath` value for an access token
#[must_use]
pub fn access_token_hash(access_token: &str) -> String {
    sha256_b64url(access_token.as_bytes())
}
