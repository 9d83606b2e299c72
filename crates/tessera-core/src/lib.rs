//! # Tessera Core
//!
//! Foundation crate shared by the DPoP and opaque-token crates.
//!
//! ## Architecture
//!
//! - `error` - the error taxonomy every operation reports through
//! - `entropy` - injectable random byte source (`OsEntropy` by default)
//! - `clock` - injectable wall clock (`SystemClock` by default)
//! - `hash` - base64url SHA-256 and constant-time comparison
//! - `config` - file + environment configuration loading
//!
//! ## Feature Flags
//!
//! - `test-utils` - deterministic `SeededEntropy`, `FixedEntropy` and `FixedClock`

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod clock;
pub mod config;
pub mod entropy;
pub mod error;
pub mod hash;

pub use clock::{Clock, SystemClock};
pub use entropy::{EntropySource, OsEntropy, random_array};
pub use error::{Error, Result, ValidationCheck};
pub use hash::{constant_time_eq, sha256_b64url};

#[cfg(any(test, feature = "test-utils"))]
pub use clock::FixedClock;
#[cfg(any(test, feature = "test-utils"))]
pub use entropy::{FixedEntropy, SeededEntropy};
