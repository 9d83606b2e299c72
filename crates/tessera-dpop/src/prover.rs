//! Proof generation (holder side)

use std::sync::Arc;

use tessera_core::{Clock, EntropySource, OsEntropy, Result, SystemClock};

use crate::DPOP_JWT_TYPE;
use crate::claims::{ProofClaims, access_token_hash, generate_jti};
use crate::envelope::Serializer;
use crate::http::RequestTarget;

/// Per-call options for [`Prover::prove`]
#[derive(Debug, Clone, Default)]
pub struct ProveOptions {
    /// Access token the proof should be bound to (`ath`)
    pub access_token: Option<String>,
}

impl ProveOptions {
    /// Bind the proof to `access_token`
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

/// Creates signed DPoP proofs for outgoing requests
///
/// Holds no per-request state; one prover can be shared across threads.
#[derive(Debug)]
pub struct Prover<S> {
    serializer: S,
    entropy: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
}

impl<S: Serializer> Prover<S> {
    /// Create a prover using OS randomness and the system clock
    pub fn new(serializer: S) -> Self {
        Self {
            serializer,
            entropy: Arc::new(OsEntropy),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the entropy source used for JTIs
    #[must_use]
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Replace the clock used for `iat`
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The serializer this prover signs with
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Produce a proof for `method` and `url`
    ///
    /// # Errors
    ///
    /// - [`tessera_core::Error::Argument`] for a blank or unsupported method,
    ///   or a blank or malformed URL
    /// - [`tessera_core::Error::Entropy`] if no JTI can be drawn
    /// - [`tessera_core::Error::Signing`] if the serializer fails
    pub fn prove(&self, method: &str, url: &str, options: &ProveOptions) -> Result<String> {
        let target = RequestTarget::new(method, url)?;

        let claims = ProofClaims {
            jti: generate_jti(self.entropy.as_ref())?,
            htm: target.method,
            htu: target.url,
            iat: self.clock.now_unix()?,
            ath: options.access_token.as_deref().map(access_token_hash),
        };

        let proof = self.serializer.serialize(DPOP_JWT_TYPE, &claims)?;

        tracing::debug!(
            method = %claims.htm,
            htu = %claims.htu,
            bound = claims.ath.is_some(),
            "Generated DPoP proof"
        );

        Ok(proof)
    }
}
