//! Error taxonomy shared by every Tessera crate
//!
//! Acceptance in this workspace is strictly binary: every failed check is
//! reported to the immediate caller as one of the variants below, carrying a
//! human-readable reason. Mapping them onto protocol responses such as
//! `invalid_token` or `invalid_dpop_proof` is the caller's job.

use std::fmt;

use thiserror::Error;

/// Result type for Tessera operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which semantic check rejected a well-formed proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCheck {
    /// `htm` differs from the request method
    HttpMethod,
    /// `htu` differs from the canonical request URL
    HttpUrl,
    /// `iat` is older than the freshness window
    IssuedAtStale,
    /// `iat` lies further in the future than the freshness window
    IssuedAtFuture,
}

impl ValidationCheck {
    /// Stable label for logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HttpMethod => "htm",
            Self::HttpUrl => "htu",
            Self::IssuedAtStale => "iat_stale",
            Self::IssuedAtFuture => "iat_future",
        }
    }
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tessera error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Blank or malformed caller input
    #[error("Invalid argument: {reason}")]
    Argument { reason: String },

    /// Wire shape violation (token layout, proof header, claim encoding)
    #[error("Malformed input: {reason}")]
    Format { reason: String },

    /// Well-formed but semantically wrong
    #[error("Validation failed ({check}): {reason}")]
    Validation {
        check: ValidationCheck,
        reason: String,
    },

    /// The proof identifier was already consumed
    #[error("Replay detected for key {replay_key}")]
    Replay { replay_key: String },

    /// Confirmation or access-token hash mismatch
    #[error("Binding mismatch: {reason}")]
    Binding { reason: String },

    /// MAC or signature mismatch
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    /// Replay store failure
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// Random number generator failure
    #[error("Entropy source failure: {reason}")]
    Entropy { reason: String },

    /// Payload source failure
    #[error("Payload source failure: {reason}")]
    Source { reason: String },

    /// Signing collaborator failure
    #[error("Signing failed: {reason}")]
    Signing { reason: String },

    /// Invalid construction-time settings
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl Error {
    /// Shorthand for [`Error::Argument`]
    pub fn argument(reason: impl Into<String>) -> Self {
        Self::Argument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Format`]
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Validation`]
    pub fn validation(check: ValidationCheck, reason: impl Into<String>) -> Self {
        Self::Validation {
            check,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Binding`]
    pub fn binding(reason: impl Into<String>) -> Self {
        Self::Binding {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Authentication`]
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Storage`]
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Signing`]
    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Signing {
            reason: reason.into(),
        }
    }

    /// Get error category for metrics and logging
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Argument { .. } => "argument",
            Self::Format { .. } => "format",
            Self::Validation { .. } => "validation",
            Self::Replay { .. } => "replay",
            Self::Binding { .. } => "binding",
            Self::Authentication { .. } => "authentication",
            Self::Storage { .. } => "storage",
            Self::Entropy { .. } => "entropy",
            Self::Source { .. } => "source",
            Self::Signing { .. } => "signing",
            Self::Configuration { .. } => "configuration",
        }
    }

    /// Whether the failure lies with the presented credential rather than
    /// with the verifier's own infrastructure
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Argument { .. }
                | Self::Format { .. }
                | Self::Validation { .. }
                | Self::Replay { .. }
                | Self::Binding { .. }
                | Self::Authentication { .. }
        )
    }

    /// The failed check, for [`Error::Validation`]
    #[must_use]
    pub fn validation_check(&self) -> Option<ValidationCheck> {
        match self {
            Self::Validation { check, .. } => Some(*check),
            _ => None,
        }
    }
}
