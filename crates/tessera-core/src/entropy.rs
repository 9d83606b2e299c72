//! Pluggable randomness
//!
//! Every component that draws random bytes takes an [`EntropySource`] at
//! construction. Production code uses [`OsEntropy`]; the deterministic
//! sources are only compiled for tests.

use std::fmt::Debug;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::{Error, Result};

/// Fixed-size random byte reader
pub trait EntropySource: Send + Sync + Debug {
    /// Fill `dest` completely or fail
    ///
    /// # Errors
    /// Returns [`Error::Entropy`] if the underlying generator cannot produce bytes
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Draw an array of `N` random bytes from `source`
///
/// # Errors
/// Propagates [`Error::Entropy`] from the source
pub fn random_array<const N: usize>(source: &dyn EntropySource) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    source.fill(&mut buf)?;
    Ok(buf)
}

/// Operating-system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest).map_err(|e| Error::Entropy {
            reason: format!("OS random source failed: {e}"),
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use deterministic::{FixedEntropy, SeededEntropy};

#[cfg(any(test, feature = "test-utils"))]
mod deterministic {
    use parking_lot::Mutex;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::{EntropySource, Error, Result, RngCore};

    /// Reproducible pseudo-random stream seeded from a `u64`
    #[derive(Debug)]
    pub struct SeededEntropy {
        rng: Mutex<StdRng>,
    }

    impl SeededEntropy {
        /// Create a stream from `seed`
        #[must_use]
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }
        }
    }

    impl EntropySource for SeededEntropy {
        fn fill(&self, dest: &mut [u8]) -> Result<()> {
            self.rng.lock().fill_bytes(dest);
            Ok(())
        }
    }

    /// Replays a fixed byte script, then fails with [`Error::Entropy`]
    #[derive(Debug)]
    pub struct FixedEntropy {
        script: Vec<u8>,
        cursor: Mutex<usize>,
    }

    impl FixedEntropy {
        /// Serve `script` front to back
        #[must_use]
        pub fn new(script: impl Into<Vec<u8>>) -> Self {
            Self {
                script: script.into(),
                cursor: Mutex::new(0),
            }
        }

        /// A source that fails on the first read
        #[must_use]
        pub fn exhausted() -> Self {
            Self::new(Vec::new())
        }
    }

    impl EntropySource for FixedEntropy {
        fn fill(&self, dest: &mut [u8]) -> Result<()> {
            let mut cursor = self.cursor.lock();
            let end = *cursor + dest.len();
            if end > self.script.len() {
                return Err(Error::Entropy {
                    reason: format!(
                        "fixed entropy exhausted: wanted {} bytes, {} left",
                        dest.len(),
                        self.script.len() - *cursor
                    ),
                });
            }
            dest.copy_from_slice(&self.script[*cursor..end]);
            *cursor = end;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_os_entropy_fills_distinct_buffers() {
        let a: [u8; 32] = random_array(&OsEntropy).unwrap();
        let b: [u8; 32] = random_array(&OsEntropy).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seeded_entropy_is_reproducible() {
        let a: [u8; 16] = random_array(&SeededEntropy::new(7)).unwrap();
        let b: [u8; 16] = random_array(&SeededEntropy::new(7)).unwrap();
        let c: [u8; 16] = random_array(&SeededEntropy::new(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fixed_entropy_serves_script_then_fails() {
        let source = FixedEntropy::new(vec![1, 2, 3, 4]);
        let first: [u8; 3] = random_array(&source).unwrap();
        assert_eq!(first, [1, 2, 3]);

        let err = random_array::<2>(&source).unwrap_err();
        assert_eq!(err.category(), "entropy");

        assert!(random_array::<1>(&FixedEntropy::exhausted()).is_err());
    }

    proptest! {
        #[test]
        fn prop_fixed_entropy_replays_script_in_order(
            script in proptest::collection::vec(any::<u8>(), 1..64),
            split in any::<prop::sample::Index>(),
        ) {
            let at = split.index(script.len());
            let source = FixedEntropy::new(script.clone());

            let mut head = vec![0u8; at];
            let mut tail = vec![0u8; script.len() - at];
            source.fill(&mut head).unwrap();
            source.fill(&mut tail).unwrap();

            head.extend(tail);
            prop_assert_eq!(head, script);
        }
    }
}
