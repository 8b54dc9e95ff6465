//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for fast, high-quality, deterministic randomness.
//! Given the same seed, produces identical sequences on all platforms.
//! The simulation only uses this for spawn-point selection; nothing in
//! the combat resolution path is random.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic PRNG using the Xorshift128+ algorithm.
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
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring good
    /// distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift state must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
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

    /// Generate a random integer in range `[0, max)`.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        (self.next_u64() % max as u64) as u32
    }
}

/// SplitMix64 step, used to expand seeds into xorshift state.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive a match seed from the match id and the sorted player roster.
///
/// Hashing the roster prevents a client from predicting spawn positions
/// before the lobby is locked.
pub fn derive_match_seed(match_id: &[u8; 16], player_ids: &[[u8; 16]]) -> u64 {
    let mut sorted: Vec<[u8; 16]> = player_ids.to_vec();
    sorted.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"SPELLGRID_SEED_V1");
    hasher.update(match_id);
    for id in &sorted {
        hasher.update(id);
    }

    let digest = hasher.finalize();
    u64::from_le_bytes(digest[..8].try_into().unwrap_or([0; 8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut rng1 = DeterministicRng::new(42);
        let mut rng2 = DeterministicRng::new(42);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut rng1 = DeterministicRng::new(1);
        let mut rng2 = DeterministicRng::new(2);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int_in_range() {
        let mut rng = DeterministicRng::new(7);
        for _ in 0..1000 {
            assert!(rng.next_int(10) < 10);
        }
        assert_eq!(rng.next_int(0), 0);
    }

    #[test]
    fn test_seed_derivation_roster_order_independent() {
        let a = [1u8; 16];
        let b = [2u8; 16];
        let match_id = [9u8; 16];

        let seed1 = derive_match_seed(&match_id, &[a, b]);
        let seed2 = derive_match_seed(&match_id, &[b, a]);
        assert_eq!(seed1, seed2);
    }
}
