//! Opaque token generation and verification
//!
//! Token layout: `[prefix "_"] base62(payload) "_" base62(nonce || mac)`.
//!
//! Each token gets its own MAC key, derived with HKDF-SHA256 from the root
//! secret and the token's random nonce. The MAC is HMAC-SHA256 over a
//! domain-separation constant, the prefix and the payload, so a prefix cannot
//! be swapped without invalidating the token.

use std::fmt;
use std::sync::Arc;

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;
use zeroize::Zeroizing;

use tessera_core::{EntropySource, Error, OsEntropy, Result, random_array};

use crate::base62;
use crate::payload::{PAYLOAD_LEN, Payload, PayloadSource, RandomPayload};

/// Domain-separation constant at the start of every MAC input
pub const DOMAIN: &[u8] = b"tessera/opaque-token/v1";

/// HKDF `info` for per-token MAC keys
const HKDF_INFO: &[u8] = b"tessera opaque token mac key v1";

/// Random nonce width in bytes
pub const NONCE_LEN: usize = 12;

/// HMAC-SHA256 tag width in bytes
pub const MAC_LEN: usize = 32;

/// Width of the decoded `nonce || mac` block
pub const SEALED_LEN: usize = NONCE_LEN + MAC_LEN;

/// Encoded width of the payload block
pub const PAYLOAD_WIDTH: usize = 22;

/// Minimum encoded width of the `nonce || mac` block (the maximum is one more)
pub const SEALED_WIDTH: usize = 59;

/// Separator between token segments
pub const SEPARATOR: char = '_';

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9-]+_)?[A-Za-z0-9]{22}_[A-Za-z0-9]{59,60}$")
        .expect("Invalid token regex pattern")
});

static PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("Invalid prefix regex pattern"));

/// Whether `prefix` may be used to label tokens
#[must_use]
pub fn is_valid_prefix(prefix: &str) -> bool {
    PREFIX_REGEX.is_match(prefix)
}

/// Structural split of a token into `(prefix, payload block, sealed block)`
///
/// Nothing is authenticated here.
///
/// # Errors
/// Returns [`Error::Format`] if the token does not have the expected shape
pub fn split_token(token: &str) -> Result<(Option<&str>, &str, &str)> {
    if !TOKEN_REGEX.is_match(token) {
        return Err(Error::format("Token does not match the opaque token format"));
    }

    let mut segments = token.rsplitn(3, SEPARATOR);
    match (segments.next(), segments.next(), segments.next()) {
        (Some(sealed), Some(payload), prefix) => Ok((prefix, payload, sealed)),
        _ => Err(Error::format("Token is missing a segment")),
    }
}

/// Authenticated contents of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueToken {
    /// Prefix the token was issued with
    pub prefix: Option<String>,
    /// Payload the token carries
    pub payload: Payload,
}

/// Root secret shared by a generator and its verifiers
#[derive(Clone)]
struct MacKey {
    secret: Arc<SecretVec<u8>>,
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacKey").finish_non_exhaustive()
    }
}

impl MacKey {
    fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Configuration {
                reason: "Opaque token secret must not be empty".to_string(),
            });
        }
        Ok(Self {
            secret: Arc::new(SecretVec::new(secret.to_vec())),
        })
    }

    fn keyed_mac(
        &self,
        nonce: &[u8; NONCE_LEN],
        prefix: Option<&str>,
        payload: &Payload,
    ) -> Result<Hmac<Sha256>> {
        let hk = Hkdf::<Sha256>::new(Some(&nonce[..]), self.secret.expose_secret());
        let mut derived = Zeroizing::new([0u8; MAC_LEN]);
        hk.expand(HKDF_INFO, &mut derived[..])
            .map_err(|e| Error::Configuration {
                reason: format!("HKDF expansion failed: {e}"),
            })?;

        let mut mac =
            <Hmac<Sha256> as Mac>::new_from_slice(&derived[..]).map_err(|e| {
                Error::Configuration {
                    reason: format!("Invalid HMAC key: {e}"),
                }
            })?;
        mac.update(DOMAIN);
        if let Some(prefix) = prefix {
            mac.update(prefix.as_bytes());
            mac.update(&[SEPARATOR as u8]);
        }
        mac.update(payload);
        Ok(mac)
    }
}

/// Mints opaque tokens
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    key: MacKey,
    entropy: Arc<dyn EntropySource>,
    payload_source: Arc<dyn PayloadSource>,
}

impl TokenGenerator {
    /// Create a generator with OS randomness and UUIDv4 payloads
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `secret` is empty
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self {
            key: MacKey::new(secret.as_ref())?,
            entropy: Arc::new(OsEntropy),
            payload_source: Arc::new(RandomPayload::default()),
        })
    }

    /// Replace the entropy source used for nonces
    #[must_use]
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Replace the payload source
    #[must_use]
    pub fn with_payload_source(mut self, payload_source: Arc<dyn PayloadSource>) -> Self {
        self.payload_source = payload_source;
        self
    }

    /// A verifier sharing this generator's secret
    #[must_use]
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier {
            key: self.key.clone(),
        }
    }

    /// Mint a token, optionally labelled with `prefix`
    ///
    /// # Errors
    ///
    /// - [`Error::Argument`] if `prefix` does not match `[a-z0-9-]+`
    /// - [`Error::Source`] or [`Error::Entropy`] if the payload source fails
    /// - [`Error::Entropy`] if no nonce can be drawn
    pub fn generate(&self, prefix: Option<&str>) -> Result<String> {
        if let Some(prefix) = prefix {
            if !is_valid_prefix(prefix) {
                return Err(Error::argument(format!(
                    "Token prefix must match [a-z0-9-]+, got {prefix:?}"
                )));
            }
        }

        let payload = self.payload_source.next_payload().map_err(|e| match e {
            Error::Source { .. } | Error::Entropy { .. } => e,
            other => Error::Source {
                reason: other.to_string(),
            },
        })?;
        let nonce: [u8; NONCE_LEN] = random_array(self.entropy.as_ref())?;

        let tag = self
            .key
            .keyed_mac(&nonce, prefix, &payload)?
            .finalize()
            .into_bytes();

        let mut sealed = [0u8; SEALED_LEN];
        sealed[..NONCE_LEN].copy_from_slice(&nonce);
        sealed[NONCE_LEN..].copy_from_slice(&tag);

        let body = format!(
            "{}{SEPARATOR}{}",
            base62::encode(&payload, PAYLOAD_WIDTH),
            base62::encode(&sealed, SEALED_WIDTH)
        );

        tracing::debug!(prefix = prefix.unwrap_or_default(), "Generated opaque token");

        Ok(match prefix {
            Some(prefix) => format!("{prefix}{SEPARATOR}{body}"),
            None => body,
        })
    }
}

/// Authenticates opaque tokens without any storage lookup
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: MacKey,
}

impl TokenVerifier {
    /// Create a verifier for tokens minted under `secret`
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `secret` is empty
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self {
            key: MacKey::new(secret.as_ref())?,
        })
    }

    /// Authenticate `token` and return its prefix and payload
    ///
    /// # Errors
    ///
    /// - [`Error::Format`] if the shape, charset or base62 width is wrong
    /// - [`Error::Authentication`] if the MAC does not match
    pub fn open(&self, token: &str) -> Result<OpaqueToken> {
        let (prefix, payload_block, sealed_block) = split_token(token)?;

        let payload: [u8; PAYLOAD_LEN] = base62::decode(payload_block)?;
        let sealed: [u8; SEALED_LEN] = base62::decode(sealed_block)?;

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&sealed[..NONCE_LEN]);

        // verify_slice compares in constant time
        self.key
            .keyed_mac(&nonce, prefix, &payload)?
            .verify_slice(&sealed[NONCE_LEN..])
            .map_err(|_| {
                tracing::warn!(
                    prefix = prefix.unwrap_or_default(),
                    "Opaque token MAC mismatch"
                );
                Error::authentication("Opaque token MAC mismatch")
            })?;

        Ok(OpaqueToken {
            prefix: prefix.map(str::to_string),
            payload,
        })
    }

    /// Authenticate `token` and return its payload
    ///
    /// # Errors
    /// As [`TokenVerifier::open`]
    pub fn extract(&self, token: &str) -> Result<Payload> {
        self.open(token).map(|opened| opened.payload)
    }

    /// Authenticate `token`, discarding the payload
    ///
    /// # Errors
    /// As [`TokenVerifier::open`]
    pub fn verify(&self, token: &str) -> Result<()> {
        self.open(token).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::FixedPayload;
    use pretty_assertions::assert_eq;
    use tessera_core::{FixedEntropy, SeededEntropy};

    const SECRET: &str = "my-very-secret-key-for-mac";

    fn generator(seed: u64) -> TokenGenerator {
        let entropy: Arc<dyn EntropySource> = Arc::new(SeededEntropy::new(seed));
        TokenGenerator::new(SECRET)
            .unwrap()
            .with_payload_source(Arc::new(RandomPayload::new(Arc::clone(&entropy))))
            .with_entropy(entropy)
    }

    #[test]
    fn test_split_token() {
        let token = generator(1).generate(Some("at")).unwrap();
        let (prefix, payload, sealed) = split_token(&token).unwrap();
        assert_eq!(prefix, Some("at"));
        assert_eq!(payload.len(), PAYLOAD_WIDTH);
        assert!(sealed.len() == 59 || sealed.len() == 60);

        let bare = generator(1).generate(None).unwrap();
        assert_eq!(split_token(&bare).unwrap().0, None);
    }

    #[test]
    fn test_open_reports_prefix() {
        let generator = generator(2);
        let token = generator.generate(Some("session-v2")).unwrap();
        let opened = generator.verifier().open(&token).unwrap();
        assert_eq!(opened.prefix.as_deref(), Some("session-v2"));
    }

    #[test]
    fn test_invalid_prefixes_are_arguments() {
        let generator = generator(3);
        for prefix in ["", "AT", "a_t", "at!", "é"] {
            let err = generator.generate(Some(prefix)).unwrap_err();
            assert_eq!(err.category(), "argument", "{prefix:?}");
        }
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        assert_eq!(
            TokenGenerator::new("").unwrap_err().category(),
            "configuration"
        );
        assert_eq!(TokenVerifier::new(b"").unwrap_err().category(), "configuration");
    }

    #[test]
    fn test_entropy_exhaustion() {
        let generator = TokenGenerator::new(SECRET)
            .unwrap()
            .with_payload_source(Arc::new(FixedPayload([7; 16])))
            .with_entropy(Arc::new(FixedEntropy::exhausted()));
        assert_eq!(generator.generate(None).unwrap_err().category(), "entropy");
    }

    #[derive(Debug)]
    struct FailingSource;

    impl PayloadSource for FailingSource {
        fn next_payload(&self) -> Result<Payload> {
            Err(Error::storage("payload registry unavailable"))
        }
    }

    #[test]
    fn test_payload_source_failure_is_source_error() {
        let generator = TokenGenerator::new(SECRET)
            .unwrap()
            .with_payload_source(Arc::new(FailingSource));
        assert_eq!(generator.generate(None).unwrap_err().category(), "source");
    }

    #[test]
    fn test_wrong_secret_fails_authentication() {
        let token = generator(4).generate(Some("rt")).unwrap();
        let verifier = TokenVerifier::new("another-secret").unwrap();
        assert_eq!(verifier.verify(&token).unwrap_err().category(), "authentication");
    }

    #[test]
    fn test_oversized_sealed_block_is_format_error() {
        let token = format!("{}_{}", "0".repeat(22), "Z".repeat(60));
        let verifier = TokenVerifier::new(SECRET).unwrap();
        assert_eq!(verifier.extract(&token).unwrap_err().category(), "format");
    }
}
