//! Wall-clock capability used for `iat` stamping, freshness checks and
//! time-ordered payloads

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, Result};

/// Source of the current Unix time in seconds
pub trait Clock: Send + Sync + Debug {
    /// Seconds since the Unix epoch
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the system clock is before the epoch
    fn now_unix(&self) -> Result<i64>;

    /// Milliseconds since the Unix epoch
    ///
    /// Defaults to whole seconds scaled up; clocks with finer resolution
    /// override it.
    ///
    /// # Errors
    /// Same as [`Clock::now_unix`]
    fn now_unix_millis(&self) -> Result<i64> {
        Ok(self.now_unix()?.saturating_mul(1_000))
    }
}

fn since_epoch() -> Result<std::time::Duration> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| Error::Configuration {
            reason: "System clock before Unix epoch".to_string(),
        })
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> Result<i64> {
        since_epoch().map(|d| d.as_secs() as i64)
    }

    fn now_unix_millis(&self) -> Result<i64> {
        since_epoch().map(|d| d.as_millis() as i64)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use fixed::FixedClock;

#[cfg(any(test, feature = "test-utils"))]
mod fixed {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::{Clock, Result};

    /// Manually driven clock
    #[derive(Debug)]
    pub struct FixedClock {
        now: AtomicI64,
    }

    impl FixedClock {
        /// Start at `now` (Unix seconds)
        #[must_use]
        pub fn at(now: i64) -> Self {
            Self {
                now: AtomicI64::new(now),
            }
        }

        /// Move the clock by `secs` (negative moves it back)
        pub fn advance(&self, secs: i64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now_unix(&self) -> Result<i64> {
            Ok(self.now.load(Ordering::SeqCst))
        }
    }
}
