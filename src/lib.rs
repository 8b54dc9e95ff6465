//! # Spellgrid Game Server
//!
//! Authoritative combat simulation for Spellgrid, a real-time multiplayer
//! arena game on a shared tile grid.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SPELLGRID SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── vec2.rs     - Continuous 2D vector math                 │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for desync detection        │
//! │                                                              │
//! │  game/           - Combat simulation (deterministic)         │
//! │  ├── grid.rs     - Tile grid, walkability, bounds            │
//! │  ├── catalog.rs  - Attack definitions and scaling curves     │
//! │  ├── combatant.rs- Health, status timers, CC immunity        │
//! │  ├── projectile.rs- Kinematics and collision resolution      │
//! │  ├── area.rs     - Splash and explosion resolution           │
//! │  ├── effect.rs   - On-hit effect application                 │
//! │  ├── cast.rs     - Cast intent validation and resolution     │
//! │  ├── state.rs    - Match state and combat entities           │
//! │  ├── tick.rs     - Authoritative simulation loop             │
//! │  └── events.rs   - Per-tick outcome stream                   │
//! │                                                              │
//! │  runtime/        - Match hosting (non-deterministic timing)  │
//! │  ├── session.rs  - Intent queue and match lifecycle          │
//! │  └── runner.rs   - Fixed-rate tick driver per match          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic for a fixed intent
//! stream:
//! - No HashMap in simulation state (BTreeMap for sorted iteration)
//! - No system time dependencies (all timers are match-clock ticks)
//! - All randomness from a seeded Xorshift128+
//!
//! Given identical intents and RNG seed, two matches produce identical
//! state hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod runtime;

// Re-export commonly used types
pub use crate::core::hash::StateHash;
pub use crate::core::rng::DeterministicRng;
pub use crate::core::vec2::Vec2;
pub use game::catalog::{AttackCatalog, AttackDefinition, AttackId, OnHitEffect};
pub use game::combatant::{CombatantStatus, PlayerId};
pub use game::state::MatchState;
pub use game::tick::{tick, IntentFrame, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 30;

/// Grace ticks appended after a hard-CC effect expires, during which new
/// freeze/root grants are rejected (2 seconds at 30 Hz).
pub const CC_IMMUNITY_WINDOW_TICKS: u64 = 60;

/// Convert a duration in seconds to simulation ticks.
#[inline]
pub fn secs_to_ticks(secs: f32) -> u64 {
    (secs * TICK_RATE as f32).round() as u64
}
