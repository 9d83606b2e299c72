//! Token kinds and their prefixes
//!
//! The prefix is part of the MAC input, so a token minted as one kind fails
//! authentication if relabelled as another.

use std::fmt;

use serde::{Deserialize, Serialize};

use tessera_core::{Error, Result};

use crate::codec::{TokenGenerator, TokenVerifier, split_token};
use crate::payload::Payload;

/// Kinds of opaque token an issuer mints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// OAuth access token
    AccessToken,
    /// OAuth refresh token
    RefreshToken,
    /// Authorization code
    AuthorizeCode,
    /// Phantom token, exchanged for a structured token at the gateway
    PhantomToken,
    /// Device authorization code
    DeviceCode,
    /// Unlabelled token
    Unspecified,
}

impl TokenKind {
    /// Every kind, labelled ones first
    pub const ALL: [Self; 6] = [
        Self::AccessToken,
        Self::RefreshToken,
        Self::AuthorizeCode,
        Self::PhantomToken,
        Self::DeviceCode,
        Self::Unspecified,
    ];

    /// Prefix tokens of this kind carry
    #[must_use]
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::AccessToken => Some("at"),
            Self::RefreshToken => Some("rt"),
            Self::AuthorizeCode => Some("ac"),
            Self::PhantomToken => Some("pt"),
            Self::DeviceCode => Some("dc"),
            Self::Unspecified => None,
        }
    }

    /// Kind for a token prefix; `None` means no prefix
    #[must_use]
    pub fn from_prefix(prefix: Option<&str>) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::AuthorizeCode => "authorize_code",
            Self::PhantomToken => "phantom_token",
            Self::DeviceCode => "device_code",
            Self::Unspecified => "unspecified",
        };
        f.write_str(name)
    }
}

/// Mints and checks tokens by kind
#[derive(Debug, Clone)]
pub struct TokenRouter {
    generator: TokenGenerator,
    verifier: TokenVerifier,
}

impl TokenRouter {
    /// Route through `generator` and a verifier sharing its secret
    #[must_use]
    pub fn new(generator: TokenGenerator) -> Self {
        let verifier = generator.verifier();
        Self {
            generator,
            verifier,
        }
    }

    /// Mint a token of `kind`
    ///
    /// # Errors
    /// As [`TokenGenerator::generate`]
    pub fn generate(&self, kind: TokenKind) -> Result<String> {
        self.generator.generate(kind.prefix())
    }

    /// Authenticate a token of any kind and return its payload
    ///
    /// # Errors
    /// As [`TokenVerifier::extract`]
    pub fn extract(&self, token: &str) -> Result<Payload> {
        self.verifier.extract(token)
    }

    /// Authenticate a token that must be of `kind`
    ///
    /// # Errors
    /// As [`TokenVerifier::extract`], plus [`Error::Authentication`] when the
    /// authenticated prefix belongs to another kind
    pub fn extract_kind(&self, kind: TokenKind, token: &str) -> Result<Payload> {
        let opened = self.verifier.open(token)?;
        if opened.prefix.as_deref() != kind.prefix() {
            tracing::warn!(expected = %kind, "Opaque token presented as the wrong kind");
            return Err(Error::authentication(format!("Token is not a {kind}")));
        }
        Ok(opened.payload)
    }

    /// Kind a token claims to be, without authenticating it
    ///
    /// Returns `None` for malformed tokens and unknown prefixes.
    #[must_use]
    pub fn kind_of(token: &str) -> Option<TokenKind> {
        let (prefix, _, _) = split_token(token).ok()?;
        TokenKind::from_prefix(prefix)
    }
}
