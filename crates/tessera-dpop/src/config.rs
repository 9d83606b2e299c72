//! Verifier configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tessera_core::{Error, Result};

use crate::DEFAULT_FRESHNESS_WINDOW_SECONDS;
use crate::replay::{DEFAULT_REPLAY_TTL, ReplayMode};

/// Settings for [`crate::Verifier`]
///
/// Loadable through [`tessera_core::config::load`]; every field has a default
/// so an empty document yields [`DpopConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpopConfig {
    /// Accepted distance between `iat` and the verifier clock, in seconds
    pub freshness_window_secs: u64,

    /// Lifetime of replay entries, in seconds; passed to the store on every
    /// write
    pub replay_ttl_secs: u64,

    /// Deadline for each replay-store call, in milliseconds
    pub store_timeout_ms: Option<u64>,

    /// How the verifier consumes replay slots
    pub replay_mode: ReplayMode,
}

impl Default for DpopConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECONDS,
            replay_ttl_secs: DEFAULT_REPLAY_TTL.as_secs(),
            store_timeout_ms: None,
            replay_mode: ReplayMode::default(),
        }
    }
}

impl DpopConfig {
    /// Check the settings are usable together
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the window is zero, if replay
    /// entries could expire before a proof leaves the window, or if the store
    /// timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.freshness_window_secs == 0 {
            return Err(Error::Configuration {
                reason: "freshness_window_secs must be positive".to_string(),
            });
        }
        // A proof stays acceptable for the whole window on either side of
        // now, and the clock only resolves whole seconds
        if self.replay_ttl_secs <= self.freshness_window_secs.saturating_mul(2) {
            return Err(Error::Configuration {
                reason: format!(
                    "replay_ttl_secs ({}) must exceed twice the freshness window ({})",
                    self.replay_ttl_secs, self.freshness_window_secs
                ),
            });
        }
        if self.store_timeout_ms == Some(0) {
            return Err(Error::Configuration {
                reason: "store_timeout_ms must be positive when set".to_string(),
            });
        }
        Ok(())
    }

    /// Freshness window as a signed second count for `iat` arithmetic
    #[must_use]
    pub fn freshness_window(&self) -> i64 {
        i64::try_from(self.freshness_window_secs).unwrap_or(i64::MAX)
    }

    /// Replay entry lifetime
    #[must_use]
    pub fn replay_ttl(&self) -> Duration {
        Duration::from_secs(self.replay_ttl_secs)
    }

    /// Per-call replay store deadline
    #[must_use]
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::config::{FileFormat, from_str};

    #[test]
    fn test_default_config_is_valid() {
        let config = DpopConfig::default();
        assert_eq!(config.freshness_window(), 15);
        assert_eq!(config.replay_ttl(), Duration::from_secs(60));
        assert_eq!(config.store_timeout(), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: DpopConfig = from_str(
            "store_timeout_ms = 250\nreplay_mode = \"insert_if_absent\"",
            FileFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.freshness_window_secs, 15);
        assert_eq!(config.store_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.replay_mode, ReplayMode::InsertIfAbsent);
    }

    #[test]
    fn test_validate_rejects_inconsistent_settings() {
        let zero_window = DpopConfig {
            freshness_window_secs: 0,
            ..DpopConfig::default()
        };
        let short_ttl = DpopConfig {
            replay_ttl_secs: 20,
            ..DpopConfig::default()
        };
        let zero_timeout = DpopConfig {
            store_timeout_ms: Some(0),
            ..DpopConfig::default()
        };

        let exact_ttl = DpopConfig {
            replay_ttl_secs: 30,
            ..DpopConfig::default()
        };

        for config in [zero_window, short_ttl, zero_timeout, exact_ttl] {
            assert_eq!(config.validate().unwrap_err().category(), "configuration");
        }
    }

    #[test]
    fn test_validate_handles_extreme_windows() {
        let huge_window = DpopConfig {
            freshness_window_secs: u64::MAX / 2 + 1,
            replay_ttl_secs: u64::MAX,
            ..DpopConfig::default()
        };
        assert_eq!(
            huge_window.validate().unwrap_err().category(),
            "configuration"
        );

        let largest = DpopConfig {
            freshness_window_secs: u64::MAX / 2 - 1,
            replay_ttl_secs: u64::MAX,
            ..DpopConfig::default()
        };
        largest.validate().unwrap();
        assert_eq!(largest.freshness_window(), i64::MAX - 1);
    }

    #[test]
    fn test_large_window_from_document_is_rejected() {
        let config: DpopConfig = from_str(
            "freshness_window_secs = 9223372036854775807",
            FileFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.validate().unwrap_err().category(), "configuration");
    }
}
