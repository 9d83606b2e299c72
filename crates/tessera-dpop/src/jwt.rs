//! JWT envelope adapter built on `jsonwebtoken`
//!
//! [`Es256Signer`] signs proofs with an ECDSA P-256 key and embeds the public
//! JWK in the header, as RFC 9449 requires. [`JwtParser`] decodes a compact
//! JWT and exposes the header for the verifier's gates; signature checking
//! happens only when the verifier asks for the claims.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{
    AlgorithmParameters, CommonParameters, EllipticCurve, EllipticCurveKeyParameters,
    EllipticCurveKeyType, Jwk, KeyAlgorithm, PublicKeyUse,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::EncodePrivateKey;
use serde::Serialize;
use serde::de::DeserializeOwned;

use tessera_core::{Error, Result};

use crate::envelope::{ParsedProof, Parser, Serializer};
use crate::jwk::ProofJwk;

/// Algorithms accepted on the verification side
///
/// Whitelist, so `none` and HMAC algorithms can never be selected by a proof.
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::RS256,
    Algorithm::PS256,
    Algorithm::EdDSA,
];

/// ES256 proof signer
pub struct Es256Signer {
    encoding_key: EncodingKey,
    header_jwk: Jwk,
    public_key: ProofJwk,
}

impl fmt::Debug for Es256Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Es256Signer")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl Es256Signer {
    /// Generate a fresh P-256 key pair
    ///
    /// # Errors
    /// Returns [`Error::Signing`] if the key cannot be encoded
    pub fn generate() -> Result<Self> {
        use rand::rngs::OsRng;

        Self::from_signing_key(&SigningKey::random(&mut OsRng))
    }

    /// Wrap an existing P-256 signing key
    ///
    /// # Errors
    /// Returns [`Error::Signing`] if the key cannot be converted to PKCS#8
    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self> {
        // jsonwebtoken wants PKCS#8 DER for EC keys
        let secret_key = p256::SecretKey::from_bytes(&signing_key.to_bytes()).map_err(|e| {
            Error::Signing {
                reason: format!("Invalid EC private key: {e}"),
            }
        })?;
        let pkcs8_der = secret_key.to_pkcs8_der().map_err(|e| Error::Signing {
            reason: format!("Failed to convert EC key to PKCS#8: {e}"),
        })?;
        let encoding_key = EncodingKey::from_ec_der(pkcs8_der.as_bytes());

        let point = VerifyingKey::from(signing_key).to_encoded_point(false);
        let (x, y) = match (point.x(), point.y()) {
            (Some(x), Some(y)) => (URL_SAFE_NO_PAD.encode(x), URL_SAFE_NO_PAD.encode(y)),
            _ => {
                return Err(Error::signing(
                    "Failed to extract coordinates from P-256 public key",
                ));
            }
        };

        let header_jwk = Jwk {
            common: CommonParameters {
                public_key_use: Some(PublicKeyUse::Signature),
                key_algorithm: Some(KeyAlgorithm::ES256),
                ..Default::default()
            },
            algorithm: AlgorithmParameters::EllipticCurve(EllipticCurveKeyParameters {
                key_type: EllipticCurveKeyType::EC,
                curve: EllipticCurve::P256,
                x: x.clone(),
                y: y.clone(),
            }),
        };

        Ok(Self {
            encoding_key,
            header_jwk,
            public_key: ProofJwk::Ec {
                crv: "P-256".to_string(),
                x,
                y,
            },
        })
    }

    /// Thumbprint of this signer's key, the `jkt` a verifier will compute
    ///
    /// # Errors
    /// Returns [`Error::Format`] if the canonical JWK cannot be serialized
    pub fn thumbprint(&self) -> Result<String> {
        self.public_key.thumbprint()
    }
}

impl Serializer for Es256Signer {
    fn serialize<C: Serialize>(&self, typ: &str, claims: &C) -> Result<String> {
        let mut header = Header::new(Algorithm::ES256);
        header.typ = Some(typ.to_string());
        header.jwk = Some(self.header_jwk.clone());

        let jwt = jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            Error::Signing {
                reason: format!("JWT signing failed: {e}"),
            }
        })?;

        tracing::trace!(typ, "Signed JWT with ES256");
        Ok(jwt)
    }

    fn public_key(&self) -> &ProofJwk {
        &self.public_key
    }
}

/// Compact JWT parser
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtParser;

/// A decoded compact JWT awaiting verification
#[derive(Debug, Clone)]
pub struct JwtProof {
    raw: String,
    algorithm: Algorithm,
    typ: Option<String>,
    public_key: Option<ProofJwk>,
}

impl JwtProof {
    /// Signing algorithm declared in the header
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl Parser for JwtParser {
    type Proof = JwtProof;

    fn parse(&self, raw: &str) -> Result<JwtProof> {
        let header = jsonwebtoken::decode_header(raw).map_err(|e| Error::Format {
            reason: format!("Failed to decode JWT header: {e}"),
        })?;

        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(Error::format(format!(
                "Algorithm {:?} not allowed for proofs",
                header.alg
            )));
        }

        let public_key = header.jwk.as_ref().map(jwk_to_proof_jwk).transpose()?;

        Ok(JwtProof {
            raw: raw.to_string(),
            algorithm: header.alg,
            typ: header.typ,
            public_key,
        })
    }
}

impl ParsedProof for JwtProof {
    fn typ(&self) -> Option<&str> {
        self.typ.as_deref()
    }

    fn public_key(&self) -> Option<&ProofJwk> {
        self.public_key.as_ref()
    }

    fn claims<C: DeserializeOwned>(&self, key: &ProofJwk) -> Result<C> {
        let decoding_key = decoding_key(key)?;

        // Freshness is the verifier's job; disable jsonwebtoken's own time checks
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<serde_json::Value>(&self.raw, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidEcdsaKey
                | ErrorKind::InvalidKeyFormat => Error::Authentication {
                    reason: format!("JWT signature verification failed: {e}"),
                },
                _ => Error::Format {
                    reason: format!("Failed to decode JWT claims: {e}"),
                },
            })?;

        serde_json::from_value(data.claims).map_err(|e| Error::Format {
            reason: format!("Unexpected claim set: {e}"),
        })
    }
}

/// Convert a header JWK into the verifier's key type
fn jwk_to_proof_jwk(jwk: &Jwk) -> Result<ProofJwk> {
    let value = serde_json::to_value(jwk).map_err(|e| Error::Format {
        reason: format!("Failed to serialize JWK: {e}"),
    })?;
    serde_json::from_value(value).map_err(|e| Error::Format {
        reason: format!("Invalid JWK in header: {e}"),
    })
}

/// Convert JWK to a jsonwebtoken `DecodingKey`
fn decoding_key(jwk: &ProofJwk) -> Result<DecodingKey> {
    match jwk {
        ProofJwk::Ec { x, y, .. } => DecodingKey::from_ec_components(x, y),
        ProofJwk::Rsa { n, e } => DecodingKey::from_rsa_components(n, e),
        ProofJwk::Okp { x, .. } => DecodingKey::from_ed_components(x),
    }
    .map_err(|e| Error::Format {
        reason: format!("Failed to create {} decoding key: {e}", jwk.kty()),
    })
}
