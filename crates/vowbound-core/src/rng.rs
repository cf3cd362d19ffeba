//! Random number generator abstraction for determinism.
//!
//! Production code draws from [`SystemRng`], a cryptographically seeded
//! generator. Tests and replays inject a seeded or scripted implementation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;
}

/// `StdRng`-backed generator seeded from the operating system.
#[derive(Debug, Clone)]
pub struct SystemRng(StdRng);

impl SystemRng {
    /// Seeds a generator from OS entropy.
    #[must_use]
    pub fn from_os_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Seeds a generator from a fixed value, for reproducible sessions.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        Self::from_os_entropy()
    }
}

impl DeterministicRng for SystemRng {
    /// # Panics
    ///
    /// Panics if `min > max`.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        self.0.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0.random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_rng_stays_within_inclusive_bounds() {
        let mut rng = SystemRng::seeded(7);
        for _ in 0..1_000 {
            let value = rng.next_u32_range(1, 20);
            assert!((1..=20).contains(&value));
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = SystemRng::seeded(42);
        let mut b = SystemRng::seeded(42);
        let left: Vec<u32> = (0..16).map(|_| a.next_u32_range(1, 100)).collect();
        let right: Vec<u32> = (0..16).map(|_| b.next_u32_range(1, 100)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_next_f64_is_unit_interval() {
        let mut rng = SystemRng::seeded(3);
        let value = rng.next_f64();
        assert!((0.0..1.0).contains(&value));
    }
}
