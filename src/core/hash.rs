//! State Hashing for Verification
//!
//! SHA-256 over the deterministic session state. Used by replays to confirm
//! that re-simulating a transcript lands on the exact same world.

use sha2::{Sha256, Digest};
use super::fixed::Fixed;
use super::vec2::FixedVec2;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for session state.
///
/// Order of updates is part of the hash, so callers must walk collections
/// in a fixed order (the `BTreeMap`s in the state already iterate by id).
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Hasher for the session state.
    pub fn for_session_state() -> Self {
        Self::new(b"LANE_RUNNER_STATE_V1")
    }

    /// Hasher for recorded input streams.
    pub fn for_input_stream() -> Self {
        Self::new(b"LANE_RUNNER_INPUTS_V1")
    }

    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    #[inline]
    pub fn update_i8(&mut self, value: i8) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_i64(&mut self, value: i64) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_fixed(&mut self, value: Fixed) {
        self.hasher.update(value.to_le_bytes());
    }

    #[inline]
    pub fn update_vec2(&mut self, value: FixedVec2) {
        self.update_fixed(value.x);
        self.update_fixed(value.y);
    }

    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a simple hash of arbitrary data.
pub fn hash_bytes(data: &[u8]) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the state hash of a session.
///
/// Tick and seed always go first; `add_state` appends the world.
pub fn compute_state_hash<F>(tick: u32, seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_session_state();

    hasher.update_u32(tick);
    hasher.update_u64(seed);

    add_state(&mut hasher);

    hasher.finalize()
}

/// Short hex prefix of a hash for log lines.
pub fn short_hex(hash: &StateHash) -> String {
    hex::encode(&hash[..8])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_session_state();
            hasher.update_u32(100);
            hasher.update_i8(-1);
            hasher.update_fixed(to_fixed(5.5));
            hasher.update_vec2(FixedVec2::new(to_fixed(1.0), to_fixed(2.0)));
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domains_differ() {
        let a = StateHasher::for_session_state().finalize();
        let b = StateHasher::for_input_stream().finalize();
        assert_ne!(a, b);
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(100, 12345, |h| {
            h.update_fixed(to_fixed(5.0));
        });
        let same = compute_state_hash(100, 12345, |h| {
            h.update_fixed(to_fixed(5.0));
        });
        let later = compute_state_hash(101, 12345, |h| {
            h.update_fixed(to_fixed(5.0));
        });

        assert_eq!(hash, same);
        assert_ne!(hash, later);
    }

    #[test]
    fn test_short_hex() {
        let hash = hash_bytes(b"lane");
        let short = short_hex(&hash);
        assert_eq!(short.len(), 16);
        assert!(hex::encode(hash).starts_with(&short));
    }
}
