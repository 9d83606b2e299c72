//! Payload sources for opaque tokens
//!
//! The payload is the 16 bytes a token carries and [`crate::TokenVerifier`]
//! hands back. Issuers usually treat it as a UUID and key their own records
//! on it.

use std::fmt::Debug;
use std::sync::Arc;

use uuid::{Builder, Uuid};

use tessera_core::{
    Clock, EntropySource, Error, OsEntropy, Result, SystemClock, random_array,
};

/// Payload width in bytes
pub const PAYLOAD_LEN: usize = 16;

/// A token payload
pub type Payload = [u8; PAYLOAD_LEN];

/// Produces the payload for each new token
pub trait PayloadSource: Send + Sync + Debug {
    /// Next payload
    ///
    /// # Errors
    /// Returns [`Error::Source`] (or [`Error::Entropy`] for RNG-backed
    /// sources) when no payload can be produced
    fn next_payload(&self) -> Result<Payload>;
}

/// Random UUIDv4 payloads
#[derive(Debug, Clone)]
pub struct RandomPayload {
    entropy: Arc<dyn EntropySource>,
}

impl RandomPayload {
    /// Draw payloads from `entropy`
    pub fn new(entropy: Arc<dyn EntropySource>) -> Self {
        Self { entropy }
    }
}

impl Default for RandomPayload {
    fn default() -> Self {
        Self::new(Arc::new(OsEntropy))
    }
}

impl PayloadSource for RandomPayload {
    fn next_payload(&self) -> Result<Payload> {
        let bytes: Payload = random_array(self.entropy.as_ref())?;
        Ok(Builder::from_random_bytes(bytes).into_uuid().into_bytes())
    }
}

/// Time-ordered UUIDv7 payloads, for issuers that index tokens by payload
#[derive(Debug, Clone)]
pub struct TimeOrderedPayload {
    entropy: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
}

impl TimeOrderedPayload {
    /// Draw the random part of each UUID from `entropy`, stamped by the
    /// system clock
    pub fn new(entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            entropy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock that supplies the UUID timestamp
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for TimeOrderedPayload {
    fn default() -> Self {
        Self::new(Arc::new(OsEntropy))
    }
}

impl PayloadSource for TimeOrderedPayload {
    fn next_payload(&self) -> Result<Payload> {
        let millis = self.clock.now_unix_millis().map_err(|e| Error::Source {
            reason: e.to_string(),
        })?;
        let millis = u64::try_from(millis).map_err(|_| Error::Source {
            reason: format!("Timestamp {millis}ms out of range for UUIDv7"),
        })?;

        let random: [u8; 10] = random_array(self.entropy.as_ref())?;
        Ok(Builder::from_unix_timestamp_millis(millis, &random)
            .into_uuid()
            .into_bytes())
    }
}

/// Always yields the same payload
#[derive(Debug, Clone, Copy)]
pub struct FixedPayload(pub Payload);

impl PayloadSource for FixedPayload {
    fn next_payload(&self) -> Result<Payload> {
        Ok(self.0)
    }
}

/// Render a payload in hyphenated UUID form
#[must_use]
pub fn payload_uuid(payload: &Payload) -> Uuid {
    Uuid::from_bytes(*payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_core::{FixedClock, FixedEntropy, SeededEntropy};

    #[test]
    fn test_random_payload_is_uuid_v4() {
        let source = RandomPayload::new(Arc::new(SeededEntropy::new(3)));
        let uuid = payload_uuid(&source.next_payload().unwrap());
        assert_eq!(uuid.get_version_num(), 4);
        assert_eq!(uuid.get_variant(), uuid::Variant::RFC4122);
    }

    #[test]
    fn test_random_payload_keeps_v4_bytes() {
        let bytes: Payload = [
            0x2f, 0x82, 0x82, 0xcb, 0xe2, 0xf9, 0x49, 0x6f, 0xb1, 0x44, 0xc0, 0xaa, 0x4c, 0xed,
            0x56, 0xdb,
        ];
        let source = RandomPayload::new(Arc::new(FixedEntropy::new(bytes)));
        assert_eq!(source.next_payload().unwrap(), bytes);
    }

    #[test]
    fn test_time_ordered_payload_is_uuid_v7() {
        let source = TimeOrderedPayload::new(Arc::new(SeededEntropy::new(5)));
        let first = payload_uuid(&source.next_payload().unwrap());
        assert_eq!(first.get_version_num(), 7);
    }

    #[test]
    fn test_time_ordered_payload_is_deterministic_under_fixed_clock() {
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let payload = |seed| {
            TimeOrderedPayload::new(Arc::new(SeededEntropy::new(seed)))
                .with_clock(clock.clone())
                .next_payload()
                .unwrap()
        };

        let first = payload(9);
        assert_eq!(first, payload(9));

        let (secs, nanos) = payload_uuid(&first)
            .get_timestamp()
            .unwrap()
            .to_unix();
        assert_eq!((secs, nanos), (1_700_000_000, 0));
    }

    #[test]
    fn test_time_ordered_payload_sorts_by_clock() {
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let source = TimeOrderedPayload::new(Arc::new(SeededEntropy::new(1)))
            .with_clock(clock.clone());

        let earlier = source.next_payload().unwrap();
        clock.advance(1);
        let later = source.next_payload().unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_pre_epoch_clock_is_source_error() {
        let source = TimeOrderedPayload::new(Arc::new(SeededEntropy::new(1)))
            .with_clock(Arc::new(FixedClock::at(-1)));
        assert_eq!(source.next_payload().unwrap_err().category(), "source");
    }

    #[test]
    fn test_entropy_failure_propagates() {
        let source = RandomPayload::new(Arc::new(FixedEntropy::exhausted()));
        assert_eq!(source.next_payload().unwrap_err().category(), "entropy");

        let source = TimeOrderedPayload::new(Arc::new(FixedEntropy::exhausted()));
        assert_eq!(source.next_payload().unwrap_err().category(), "entropy");
    }
}
