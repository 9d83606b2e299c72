//! Proof verification (resource-server side)
//!
//! [`Verifier::verify`] runs a fixed gate sequence and stops at the first
//! failure:
//!
//! 1. argument checks on the method, URL and proof
//! 2. structural parse of the proof
//! 3. header checks (`typ`, embedded key)
//! 4. signature verification and claim decoding
//! 5. `htm`, `htu` and `iat` validation
//! 6. anti-replay through the [`ReplayStore`]
//! 7. confirmation (`jkt`) computation
//! 8. optional binding to an access token and an expected `jkt`
//!
//! Cheap checks run before cryptographic work, and a proof only consumes a
//! replay slot once it is authentic and fresh.

use std::future::Future;
use std::sync::Arc;

use tessera_core::{
    Clock, Error, Result, SystemClock, ValidationCheck, constant_time_eq,
};

use crate::DPOP_JWT_TYPE;
use crate::claims::{Confirmation, ProofClaims, access_token_hash};
use crate::config::DpopConfig;
use crate::envelope::{ParsedProof, Parser};
use crate::http::RequestTarget;
use crate::replay::{ReplayMode, ReplayStore, replay_key};

/// Per-call options for [`Verifier::verify`]
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Access token presented with the request; checked against `ath`
    pub access_token: Option<String>,

    /// Thumbprint the access token is bound to (`cnf.jkt`)
    pub expected_jkt: Option<String>,
}

impl VerifyOptions {
    /// Check `ath` against `access_token`
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Require the proof key to have thumbprint `jkt`
    #[must_use]
    pub fn with_expected_jkt(mut self, jkt: impl Into<String>) -> Self {
        self.expected_jkt = Some(jkt.into());
        self
    }
}

/// Verifies DPoP proofs and records consumed JTIs
#[derive(Debug)]
pub struct Verifier<P> {
    parser: P,
    replay_store: Arc<dyn ReplayStore>,
    clock: Arc<dyn Clock>,
    config: DpopConfig,
}

impl<P: Parser> Verifier<P> {
    /// Create a verifier with the default configuration and system clock
    pub fn new(parser: P, replay_store: Arc<dyn ReplayStore>) -> Self {
        Self {
            parser,
            replay_store,
            clock: Arc::new(SystemClock),
            config: DpopConfig::default(),
        }
    }

    /// Apply `config` after validating it
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the settings are inconsistent
    pub fn with_config(mut self, config: DpopConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Replace the clock used for freshness checks
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &DpopConfig {
        &self.config
    }

    /// Verify `proof` for a request to `method` `url`
    ///
    /// # Errors
    ///
    /// - [`Error::Argument`] for blank or malformed inputs
    /// - [`Error::Format`] if the proof cannot be parsed, has the wrong `typ`,
    ///   carries no public key, or has malformed claims
    /// - [`Error::Authentication`] if the signature does not verify
    /// - [`Error::Validation`] if `htm`, `htu` or `iat` do not match
    /// - [`Error::Replay`] if the JTI was already consumed
    /// - [`Error::Storage`] if the replay store fails or times out
    /// - [`Error::Binding`] if `ath` or the thumbprint differ from the options
    pub async fn verify(
        &self,
        method: &str,
        url: &str,
        proof: &str,
        options: &VerifyOptions,
    ) -> Result<Confirmation> {
        // Gate 1: arguments
        let target = RequestTarget::new(method, url)?;
        if proof.trim().is_empty() {
            return Err(Error::argument("DPoP proof must not be blank"));
        }

        // Gate 2: structure
        let parsed = self.parser.parse(proof).map_err(|e| match e {
            Error::Format { .. } => e,
            other => Error::format(other.to_string()),
        })?;

        // Gate 3: header
        if parsed.typ() != Some(DPOP_JWT_TYPE) {
            return Err(Error::format(format!(
                "Invalid proof type: expected {DPOP_JWT_TYPE}, got {:?}",
                parsed.typ()
            )));
        }
        let key = parsed
            .public_key()
            .ok_or_else(|| Error::format("Proof header carries no public key"))?;

        // Gate 4: signature and claims
        let claims: ProofClaims = parsed.claims(key).inspect_err(|e| {
            if matches!(e, Error::Authentication { .. }) {
                tracing::warn!(method = %target.method, htu = %target.url, "DPoP signature rejected");
            }
        })?;

        // Gate 5: request binding and freshness
        self.validate_claims(&claims, &target)?;

        // Gate 6: replay
        let replay_key = replay_key(&claims.jti);
        self.consume_replay_slot(&replay_key).await?;

        // Gate 7: confirmation
        let confirmation = Confirmation {
            jkt: key.thumbprint()?,
        };

        // Gate 8: optional token and key binding
        if let (Some(token), Some(ath)) = (&options.access_token, &claims.ath) {
            if !constant_time_eq(ath, &access_token_hash(token)) {
                return Err(Error::binding("Access token hash mismatch"));
            }
        }
        if let Some(expected) = &options.expected_jkt {
            if !constant_time_eq(expected, &confirmation.jkt) {
                return Err(Error::binding("JWK thumbprint mismatch"));
            }
        }

        tracing::debug!(
            method = %target.method,
            htu = %target.url,
            jkt = %confirmation.jkt,
            "DPoP proof verified"
        );

        Ok(confirmation)
    }

    fn validate_claims(&self, claims: &ProofClaims, target: &RequestTarget) -> Result<()> {
        if claims.htm != target.method {
            return Err(Error::validation(
                ValidationCheck::HttpMethod,
                format!(
                    "HTTP method mismatch: expected {}, got {}",
                    target.method, claims.htm
                ),
            ));
        }

        if claims.htu != target.url {
            return Err(Error::validation(
                ValidationCheck::HttpUrl,
                format!("HTTP URI mismatch: expected {}, got {}", target.url, claims.htu),
            ));
        }

        let now = self.clock.now_unix()?;
        let window = self.config.freshness_window();
        let age = now.saturating_sub(claims.iat);

        if age > window {
            return Err(Error::validation(
                ValidationCheck::IssuedAtStale,
                format!("Proof issued {age}s ago, window is {window}s"),
            ));
        }
        if age < -window {
            return Err(Error::validation(
                ValidationCheck::IssuedAtFuture,
                format!("Proof issued {}s in the future, window is {window}s", -age),
            ));
        }

        Ok(())
    }

    async fn consume_replay_slot(&self, replay_key: &str) -> Result<()> {
        let store = self.replay_store.as_ref();
        let ttl = self.config.replay_ttl();

        let fresh = match self.config.replay_mode {
            ReplayMode::ExistsThenRegister => {
                if self.store_call(store.exists(replay_key)).await? {
                    false
                } else {
                    self.store_call(store.register(replay_key, ttl)).await?;
                    true
                }
            }
            ReplayMode::InsertIfAbsent => {
                self.store_call(store.insert_if_absent(replay_key, ttl)).await?
            }
        };

        if fresh {
            tracing::trace!(replay_key, "Consumed replay slot");
            Ok(())
        } else {
            tracing::warn!(replay_key, "DPoP replay detected");
            Err(Error::Replay {
                replay_key: replay_key.to_string(),
            })
        }
    }

    /// Run one store call under the configured deadline; every failure is a
    /// storage failure
    async fn store_call<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let outcome = match self.config.store_timeout() {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .map_err(|_| Error::storage(format!("Replay store timed out after {deadline:?}")))?,
            None => call.await,
        };

        outcome.map_err(|e| match e {
            Error::Storage { .. } => e,
            other => Error::storage(other.to_string()),
        })
    }
}
