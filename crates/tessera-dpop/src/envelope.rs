//! Signing and verification capability
//!
//! The prover and verifier never see a concrete envelope format. They hand
//! typed claims to a [`Serializer`] and get typed claims back from a
//! [`ParsedProof`]; the JWT adapter in [`crate::jwt`] is one implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;

use tessera_core::Result;

use crate::jwk::ProofJwk;

/// Signs a claim set into a compact token
pub trait Serializer: Send + Sync {
    /// Sign `claims` under header type `typ`, embedding the signer's public key
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Signing`] if the collaborator fails
    fn serialize<C: Serialize>(&self, typ: &str, claims: &C) -> Result<String>;

    /// The public key embedded in every token this serializer produces
    fn public_key(&self) -> &ProofJwk;
}

/// Parses a compact token into an inspectable handle
pub trait Parser: Send + Sync {
    /// Handle type produced by this parser
    type Proof: ParsedProof;

    /// Decode the token structure without verifying its signature
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Format`] for undecodable input
    fn parse(&self, raw: &str) -> Result<Self::Proof>;
}

/// A decoded but not yet verified token
pub trait ParsedProof: Send + Sync {
    /// Declared header type (`typ`)
    fn typ(&self) -> Option<&str>;

    /// Public key embedded in the header
    fn public_key(&self) -> Option<&ProofJwk>;

    /// RFC 7638 thumbprint of the embedded key
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Format`] if no key is embedded
    fn public_key_thumbprint(&self) -> Result<String> {
        self.public_key()
            .ok_or_else(|| tessera_core::Error::format("Proof header carries no public key"))?
            .thumbprint()
    }

    /// Verify the signature against `key` and decode the claims
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Authentication`] on signature mismatch
    /// and [`tessera_core::Error::Format`] if the claims do not decode into `C`
    fn claims<C: DeserializeOwned>(&self, key: &ProofJwk) -> Result<C>;
}
