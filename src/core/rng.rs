//! Deterministic randomness for ritual effects.
//!
//! Rituals never read ambient randomness. The host passes a `RitualRng`
//! in the tick environment, so a tick is reproducible from the world state
//! and the RNG state.
//!
//! ```
//! use essence_rituals::core::RitualRng;
//!
//! let mut a = RitualRng::new(42);
//! let mut b = RitualRng::new(42);
//! assert_eq!(a.gen_f64(), b.gen_f64());
//!
//! // A host can hand each anchor its own stream.
//! let mut grove = a.for_context("grove@10,64,10");
//! let mut grove_again = b.for_context("grove@10,64,10");
//! assert_eq!(grove.one_in(3), grove_again.one_in(3));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Deterministic RNG injected into every ritual tick.
#[derive(Clone, Debug)]
pub struct RitualRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl RitualRng {
    /// Seeded generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// A stream derived from this seed and `context`, independent of how
    /// much of this stream has been used.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        let mut hasher = rustc_hash::FxHasher::default();
        self.seed.hash(&mut hasher);
        context.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Uniform float in `[0, 1)`.
    pub fn gen_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform angle in radians, `[0, 2π)`.
    pub fn gen_angle(&mut self) -> f64 {
        self.gen_f64() * std::f64::consts::TAU
    }

    /// One chance in `n`. `n == 0` never succeeds.
    pub fn one_in(&mut self, n: u32) -> bool {
        n > 0 && self.inner.gen_range(0..n) == 0
    }

    /// Position of the stream, for persisting with the world.
    #[must_use]
    pub fn state(&self) -> RitualRngState {
        RitualRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Resume a persisted stream.
    #[must_use]
    pub fn from_state(state: &RitualRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Persisted RNG position: the seed plus the ChaCha8 word counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualRngState {
    pub seed: u64,
    pub word_pos: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(rng: &mut RitualRng) -> Vec<bool> {
        (0..32).map(|_| rng.one_in(2)).collect()
    }

    #[test]
    fn test_same_seed_same_draws() {
        assert_eq!(draws(&mut RitualRng::new(42)), draws(&mut RitualRng::new(42)));
        assert_ne!(draws(&mut RitualRng::new(1)), draws(&mut RitualRng::new(2)));
    }

    #[test]
    fn test_context_streams_ignore_usage() {
        let fresh = RitualRng::new(42);
        let mut used = RitualRng::new(42);
        used.gen_f64();

        let mut a = fresh.for_context("expulsion");
        let mut b = used.for_context("expulsion");
        assert_eq!(draws(&mut a), draws(&mut b));
        assert_ne!(draws(&mut fresh.for_context("a")), draws(&mut fresh.for_context("b")));
    }

    #[test]
    fn test_one_in_edges() {
        let mut rng = RitualRng::new(7);
        assert!(!rng.one_in(0));
        assert!(rng.one_in(1));
        let angle = rng.gen_angle();
        assert!((0.0..std::f64::consts::TAU).contains(&angle));
    }

    #[test]
    fn test_state_resumes_stream() {
        let mut rng = RitualRng::new(42);
        for _ in 0..50 {
            rng.gen_f64();
        }

        let json = serde_json::to_string(&rng.state()).unwrap();
        let state: RitualRngState = serde_json::from_str(&json).unwrap();
        let mut restored = RitualRng::from_state(&state);
        assert_eq!(draws(&mut rng), draws(&mut restored));
    }
}
