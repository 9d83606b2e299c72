//! Public keys embedded in proof headers and their RFC 7638 thumbprints

use serde::{Deserialize, Serialize};

use tessera_core::{Error, Result, sha256_b64url};

/// JSON Web Key representation for proof public keys
///
/// Only the members that take part in the RFC 7638 thumbprint are kept;
/// everything else in a header JWK (`use`, `alg`, `kid`, ...) is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
pub enum ProofJwk {
    /// Elliptic Curve public key
    #[serde(rename = "EC")]
    Ec {
        /// Curve name, e.g. `P-256`
        crv: String,
        /// X coordinate (base64url)
        x: String,
        /// Y coordinate (base64url)
        y: String,
    },

    /// RSA public key
    #[serde(rename = "RSA")]
    Rsa {
        /// Modulus (base64url)
        n: String,
        /// Public exponent (base64url)
        e: String,
    },

    /// Octet key pair (Ed25519)
    #[serde(rename = "OKP")]
    Okp {
        /// Curve name, e.g. `Ed25519`
        crv: String,
        /// Public key (base64url)
        x: String,
    },
}

impl ProofJwk {
    /// RFC 7638 thumbprint: base64url SHA-256 over the canonical member set
    ///
    /// # Errors
    /// Returns [`Error::Format`] if the canonical JSON cannot be produced
    pub fn thumbprint(&self) -> Result<String> {
        // Members listed in lexicographic order (RFC 7638 section 3.3)
        let canonical = match self {
            Self::Ec { crv, x, y } => serde_json::json!({
                "crv": crv,
                "kty": "EC",
                "x": x,
                "y": y,
            }),
            Self::Rsa { n, e } => serde_json::json!({
                "e": e,
                "kty": "RSA",
                "n": n,
            }),
            Self::Okp { crv, x } => serde_json::json!({
                "crv": crv,
                "kty": "OKP",
                "x": x,
            }),
        };

        let canonical_json = serde_json::to_string(&canonical).map_err(|e| Error::Format {
            reason: format!("Failed to serialize JWK for thumbprint: {e}"),
        })?;

        Ok(sha256_b64url(canonical_json.as_bytes()))
    }

    /// Key type name (`kty`)
    #[must_use]
    pub fn kty(&self) -> &'static str {
        match self {
            Self::Ec { .. } => "EC",
            Self::Rsa { .. } => "RSA",
            Self::Okp { .. } => "OKP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7638_rsa_thumbprint() {
        // RFC 7638 section 3.1
        let jwk = ProofJwk::Rsa {
            n: "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw".to_string(),
            e: "AQAB".to_string(),
        };
        assert_eq!(
            jwk.thumbprint().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn test_header_jwk_extra_members_are_ignored() {
        let jwk: ProofJwk = serde_json::from_value(serde_json::json!({
            "kty": "EC",
            "use": "sig",
            "alg": "ES256",
            "crv": "P-256",
            "x": "l8tFrhx-34tV3hRICRDY9zCkDlpBhF42UQUfWVAWBFs",
            "y": "9VE4jf_Ok_o64zbTTlcuNJajHmt6v9TDVrU0CdvGRDA",
        }))
        .unwrap();
        assert_eq!(jwk.kty(), "EC");
        assert_eq!(
            jwk.thumbprint().unwrap(),
            ProofJwk::Ec {
                crv: "P-256".to_string(),
                x: "l8tFrhx-34tV3hRICRDY9zCkDlpBhF42UQUfWVAWBFs".to_string(),
                y: "9VE4jf_Ok_o64zbTTlcuNJajHmt6v9TDVrU0CdvGRDA".to_string(),
            }
            .thumbprint()
            .unwrap()
        );
    }
}
