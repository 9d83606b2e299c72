//! # Tessera Token
//!
//! Opaque bearer tokens that authenticate without a database lookup.
//!
//! A token carries a 16-byte payload (a UUID by default) and a MAC keyed by
//! HKDF-SHA256 from a root secret and a fresh per-token nonce. Anyone holding
//! the secret can check a token and recover its payload; nobody else can mint
//! or alter one.
//!
//! ```text
//! at_1rEhxXi9mBwmkGpXxD4Njd_wHOKGDkYTeOIHSFgBgJOoVNdzNn7njIoE90xmNFWpWBNcAuttuQvJNaID9f
//! └┬┘└─────────┬──────────┘ └──────────────────────────┬─────────────────────────────┘
//! prefix  base62(payload)                      base62(nonce || mac)
//! ```
//!
//! ## Architecture
//!
//! - `base62` - fixed-width base62 numerals
//! - `payload` - payload sources (UUIDv4, UUIDv7, fixed)
//! - `codec` - `TokenGenerator` and `TokenVerifier`
//! - `router` - `TokenKind` prefixes and `TokenRouter`
//! - `config` - `OpaqueTokenConfig`

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod base62;
pub mod codec;
pub mod config;
pub mod payload;
pub mod router;

pub use codec::{OpaqueToken, TokenGenerator, TokenVerifier, is_valid_prefix};
pub use config::{OpaqueTokenConfig, PayloadKind};
pub use payload::{
    FixedPayload, Payload, PayloadSource, RandomPayload, TimeOrderedPayload, payload_uuid,
};
pub use router::{TokenKind, TokenRouter};
