//! Deterministic Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. Every lane kind, obstacle count,
//! speed and direction is drawn from one instance owned by the session, so a
//! seed fully determines the world a run produces.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use super::fixed::{Fixed, FIXED_ONE};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use lane_runner::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // All-zero state would lock the generator at zero
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create the RNG for a given run of a session.
    ///
    /// Each restart gets its own stream so a restarted run does not replay
    /// the world of the previous one.
    pub fn for_run(base_seed: u64, restart: u32) -> Self {
        Self::new(derive_run_seed(base_seed, restart))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random integer in range [min, max], both inclusive.
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + self.next_int(range) as i32
    }

    /// Generate a random Fixed in range [0, max).
    #[inline]
    pub fn next_fixed(&mut self, max: Fixed) -> Fixed {
        if max <= 0 {
            return 0;
        }
        let raw = (self.next_u64() >> 32) as u32;
        ((raw as i64 * max as i64) >> 32) as Fixed
    }

    /// Generate a random Fixed in range [min, max).
    #[inline]
    pub fn next_fixed_range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if min >= max {
            return min;
        }
        let range = max.wrapping_sub(min);
        min.wrapping_add(self.next_fixed(range))
    }

    /// Generate a random boolean with given probability.
    ///
    /// probability is in range [0, FIXED_ONE] where FIXED_ONE = 100%
    #[inline]
    pub fn next_bool(&mut self, probability: Fixed) -> bool {
        self.next_fixed(FIXED_ONE) < probability
    }

    /// Coin flip between -1 and +1.
    #[inline]
    pub fn next_sign(&mut self) -> i8 {
        if self.next_bool(FIXED_ONE / 2) { 1 } else { -1 }
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Returns 0 when every weight is zero.
    pub fn pick_weighted(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return 0;
        }

        let mut roll = self.next_int(total);
        for (i, &weight) in weights.iter().enumerate() {
            if roll < weight {
                return i;
            }
            roll -= weight;
        }
        weights.len() - 1
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the seed of one run from the session seed and restart count.
pub fn derive_run_seed(base_seed: u64, restart: u32) -> u64 {
    let mut hasher = Sha256::new();

    hasher.update(b"LANE_RUNNER_SEED_V1");
    hasher.update(base_seed.to_le_bytes());
    hasher.update(restart.to_le_bytes());

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(bytes)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int_range() {
        let mut rng = DeterministicRng::new(5678);

        for _ in 0..1000 {
            let val = rng.next_int_range(2, 4);
            assert!((2..=4).contains(&val));
        }

        assert_eq!(rng.next_int_range(5, 5), 5);
        assert_eq!(rng.next_int(0), 0);
    }

    #[test]
    fn test_next_fixed_range() {
        let mut rng = DeterministicRng::new(9999);

        let min = to_fixed(2.25);
        let max = to_fixed(5.25);
        for _ in 0..1000 {
            let val = rng.next_fixed_range(min, max);
            assert!(val >= min && val < max);
        }
    }

    #[test]
    fn test_next_bool_extremes() {
        let mut rng = DeterministicRng::new(31);
        for _ in 0..100 {
            assert!(rng.next_bool(FIXED_ONE));
            assert!(!rng.next_bool(0));
        }
    }

    #[test]
    fn test_next_sign_both_values() {
        let mut rng = DeterministicRng::new(77);
        let signs: Vec<i8> = (0..200).map(|_| rng.next_sign()).collect();
        assert!(signs.contains(&1));
        assert!(signs.contains(&-1));
        assert!(signs.iter().all(|s| *s == 1 || *s == -1));
    }

    #[test]
    fn test_pick_weighted() {
        let mut rng = DeterministicRng::new(4242);

        // Zero weights are never picked
        for _ in 0..500 {
            let idx = rng.pick_weighted(&[0, 60, 0, 40]);
            assert!(idx == 1 || idx == 3);
        }

        assert_eq!(rng.pick_weighted(&[0, 0]), 0);
        assert_eq!(rng.pick_weighted(&[]), 0);
    }

    #[test]
    fn test_derive_run_seed() {
        assert_eq!(derive_run_seed(7, 0), derive_run_seed(7, 0));
        assert_ne!(derive_run_seed(7, 0), derive_run_seed(7, 1));
        assert_ne!(derive_run_seed(7, 0), derive_run_seed(8, 0));
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = DeterministicRng::for_run(5555, 2);
        for _ in 0..10 {
            rng.next_u64();
        }

        let mut replica = rng.clone();
        assert_eq!(replica.state(), rng.state());

        let ahead: Vec<u64> = (0..5).map(|_| rng.next_u64()).collect();
        let again: Vec<u64> = (0..5).map(|_| replica.next_u64()).collect();
        assert_eq!(ahead, again);
        assert_eq!(replica.state(), rng.state());
    }
}
