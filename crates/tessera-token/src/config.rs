//! Opaque token configuration

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use tessera_core::Result;

use crate::codec::{TokenGenerator, TokenVerifier};
use crate::payload::{PayloadSource, RandomPayload, TimeOrderedPayload};
use crate::router::TokenRouter;

/// Which [`PayloadSource`] a configured generator uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// UUIDv4
    #[default]
    Random,
    /// UUIDv7
    TimeOrdered,
}

/// Settings for the opaque token codec
///
/// The secret is held as a [`SecretString`], so it is redacted from `Debug`
/// output and zeroed on drop.
#[derive(Debug, Clone, Deserialize)]
pub struct OpaqueTokenConfig {
    /// Root secret every per-token MAC key is derived from
    pub secret: SecretString,

    /// Payload source for new tokens
    #[serde(default)]
    pub payload: PayloadKind,
}

impl OpaqueTokenConfig {
    /// Build a generator from these settings
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Configuration`] if the secret is empty
    pub fn generator(&self) -> Result<TokenGenerator> {
        let source: Arc<dyn PayloadSource> = match self.payload {
            PayloadKind::Random => Arc::new(RandomPayload::default()),
            PayloadKind::TimeOrdered => Arc::new(TimeOrderedPayload::default()),
        };
        Ok(TokenGenerator::new(self.secret.expose_secret())?.with_payload_source(source))
    }

    /// Build a verifier from these settings
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Configuration`] if the secret is empty
    pub fn verifier(&self) -> Result<TokenVerifier> {
        TokenVerifier::new(self.secret.expose_secret())
    }

    /// Build a router from these settings
    ///
    /// # Errors
    /// Returns [`tessera_core::Error::Configuration`] if the secret is empty
    pub fn router(&self) -> Result<TokenRouter> {
        Ok(TokenRouter::new(self.generator()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::payload_uuid;
    use tessera_core::config::{FileFormat, from_str};

    #[test]
    fn test_config_from_toml() {
        let config: OpaqueTokenConfig = from_str(
            "secret = \"from-config\"\npayload = \"time_ordered\"",
            FileFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.payload, PayloadKind::TimeOrdered);
        assert!(!format!("{config:?}").contains("from-config"));

        let router = config.router().unwrap();
        let token = router.generate(crate::TokenKind::AccessToken).unwrap();
        let payload = config.verifier().unwrap().extract(&token).unwrap();
        assert_eq!(payload_uuid(&payload).get_version_num(), 7);
    }

    #[test]
    fn test_payload_defaults_to_random() {
        let config: OpaqueTokenConfig =
            from_str("{\"secret\": \"s\"}", FileFormat::Json).unwrap();
        assert_eq!(config.payload, PayloadKind::Random);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let config: OpaqueTokenConfig = from_str("secret = \"\"", FileFormat::Toml).unwrap();
        assert_eq!(config.generator().unwrap_err().category(), "configuration");
    }
}
