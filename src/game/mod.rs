//! Combat simulation: the grid, the attack catalog, combatant status,
//! projectile flight, effect application, and the tick orchestrator.

pub mod area;
pub mod cast;
pub mod catalog;
pub mod combatant;
pub mod effect;
pub mod events;
pub mod grid;
pub mod projectile;
pub mod state;
pub mod tick;

pub use cast::{resolve_cast, CastError};
pub use catalog::{AttackCatalog, AttackDefinition, AttackId, OnHitEffect};
pub use combatant::{CombatantStatus, PlayerId};
pub use events::{CombatEvent, CombatEventData, DespawnReason, ProjectileId, StatusKind};
pub use grid::{GridPos, MapError, Tile, TileGrid};
pub use projectile::Projectile;
pub use state::{MatchState, StateError, VortexField};
pub use tick::{tick, CastIntent, IntentFrame, MoveDir, TickConfig, TickResult};
