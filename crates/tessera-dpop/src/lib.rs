//! # Tessera DPoP - RFC 9449 Implementation
//!
//! Demonstrating Proof-of-Possession for OAuth 2.0. A holder signs a short
//! proof for every request with a key it controls; a resource server checks
//! the proof against the request and the token it accompanies, so a stolen
//! token is useless without the key.
//!
//! ## Architecture
//!
//! - `claims` - proof claims, key confirmation, JTI and `ath` helpers
//! - `http` - HTTP method validation and URL canonicalization
//! - `jwk` - proof public keys and RFC 7638 thumbprints
//! - `envelope` - signing and parsing capabilities
//! - `jwt` - `jsonwebtoken` implementation of the envelope (ES256 signer)
//! - `replay` - replay keys, the `ReplayStore` trait and the in-memory store
//! - `redis_storage` - Redis backend (feature-gated: `redis-storage`)
//! - `prover` - proof generation
//! - `verifier` - proof verification
//! - `config` - verifier settings
//!
//! ## Feature Flags
//!
//! - `default` - core DPoP functionality with the in-memory replay store
//! - `redis-storage` - Redis replay store
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tessera_dpop::{
//!     Es256Signer, JwtParser, MemoryReplayStore, ProveOptions, Prover, Verifier, VerifyOptions,
//! };
//!
//! # async fn example() -> tessera_core::Result<()> {
//! let prover = Prover::new(Es256Signer::generate()?);
//! let proof = prover.prove("GET", "https://api.example.com/data", &ProveOptions::default())?;
//!
//! let verifier = Verifier::new(JwtParser, Arc::new(MemoryReplayStore::new()));
//! let confirmation = verifier
//!     .verify("GET", "https://api.example.com/data", &proof, &VerifyOptions::default())
//!     .await?;
//! println!("cnf.jkt = {}", confirmation.jkt);
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod claims;
pub mod config;
pub mod envelope;
pub mod http;
pub mod jwk;
pub mod jwt;
pub mod prover;
pub mod replay;
pub mod verifier;

#[cfg(feature = "redis-storage")]
pub mod redis_storage;

pub use claims::{Confirmation, ProofClaims, access_token_hash};
pub use config::DpopConfig;
pub use envelope::{ParsedProof, Parser, Serializer};
pub use http::{RequestTarget, canonicalize_url};
pub use jwk::ProofJwk;
pub use jwt::{Es256Signer, JwtParser, JwtProof};
pub use prover::{ProveOptions, Prover};
pub use replay::{MemoryReplayStore, ReplayMode, ReplayStore, replay_key};
pub use verifier::{Verifier, VerifyOptions};

#[cfg(feature = "redis-storage")]
pub use redis_storage::RedisReplayStore;

/// DPoP JWT header type as defined in RFC 9449
pub const DPOP_JWT_TYPE: &str = "dpop+jwt";

/// Default tolerance between `iat` and the verifier clock (15 seconds)
pub const DEFAULT_FRESHNESS_WINDOW_SECONDS: u64 = 15;
