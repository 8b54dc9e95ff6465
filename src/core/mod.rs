//! Core deterministic primitives.
//!
//! All types in this module are designed for cross-run determinism: the
//! simulation must produce identical results for identical seeds and
//! intent streams.

pub mod hash;
pub mod rng;
pub mod vec2;

// Re-export core types
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use rng::DeterministicRng;
pub use vec2::Vec2;
