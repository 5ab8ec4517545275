//! Randomness sources
//!
//! Key generation and payload encryption draw randomness through the
//! [`EntropySource`] trait instead of a process-wide generator, so tests can
//! substitute a seeded source and get reproducible output.

use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{CryptoError, Result};

/// A provider of random bytes
pub trait EntropySource: Send + Sync {
    /// Fill `dest` entirely with random bytes
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;

    /// Draw an integer uniformly from `[0, bound)`
    fn below(&self, bound: usize) -> Result<usize>;
}

/// Operating system CSPRNG
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest)?;
        Ok(())
    }

    fn below(&self, bound: usize) -> Result<usize> {
        if bound == 0 {
            return Err(CryptoError::Entropy("empty range".to_string()));
        }
        Ok(OsRng.gen_range(0..bound))
    }
}

/// Deterministic source for tests and reproducible fixtures
///
/// Never use this for real keys.
pub struct SeededEntropy {
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    /// Create a source from a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        self.rng.lock().try_fill_bytes(dest)?;
        Ok(())
    }

    fn below(&self, bound: usize) -> Result<usize> {
        if bound == 0 {
            return Err(CryptoError::Entropy("empty range".to_string()));
        }
        Ok(self.rng.lock().gen_range(0..bound))
    }
}
