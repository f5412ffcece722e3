//! Deterministic random number generation for match setup.
//!
//! The rules core itself never rolls dice: every rules decision is driven by
//! player input. Randomness only enters at setup, when decks are shuffled.
//! Each player gets an independent stream derived from the match seed, so
//! the same seed always produces the same opening draws.
//!
//! ```
//! use chase_rules::core::GameRng;
//!
//! let mut a = GameRng::new(42).for_context("main_deck:0");
//! let mut b = GameRng::new(42).for_context("main_deck:0");
//!
//! let mut left = vec![1, 2, 3, 4, 5];
//! let mut right = left.clone();
//! a.shuffle(&mut left);
//! b.shuffle(&mut right);
//! assert_eq!(left, right);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hash::{Hash, Hasher};

/// Deterministic RNG backed by ChaCha8.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Derive an independent stream for a named context.
    ///
    /// The same seed and context always produce the same stream.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        let mut hasher = rustc_hash::FxHasher::default();
        self.seed.hash(&mut hasher);
        context.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// The seed this stream was created from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a random usize in the given range.
    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.gen_range_usize(0..1000), rng2.gen_range_usize(0..1000));
        }
    }

    #[test]
    fn test_contexts_are_independent() {
        let rng = GameRng::new(7);
        let mut a = rng.for_context("main_deck:0");
        let mut b = rng.for_context("main_deck:1");

        let seq_a: Vec<_> = (0..16).map(|_| a.gen_range_usize(0..1_000_000)).collect();
        let seq_b: Vec<_> = (0..16).map(|_| b.gen_range_usize(0..1_000_000)).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = GameRng::new(1);
        let mut values: Vec<u32> = (0..40).collect();
        rng.shuffle(&mut values);

        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..40).collect::<Vec<_>>());
    }
}
