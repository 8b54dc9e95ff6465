//! Combat Events
//!
//! The per-tick outcome stream. Every approved state change the
//! synchronization layer may broadcast is described here; the wire
//! encoding itself lives outside this crate.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::catalog::AttackId;
use crate::game::combatant::PlayerId;
use crate::game::grid::GridPos;

/// Monotonic spawn-order projectile identifier.
pub type ProjectileId = u64;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths processed first
    Death = 0,
    /// Then damage
    Damage = 1,
    /// Then status changes
    Status = 2,
    /// Then projectile lifecycle
    Projectile = 3,
    /// Then movement
    Movement = 4,
    /// Lowest priority
    Other = 255,
}

/// Why a projectile left the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DespawnReason {
    /// Left world bounds
    OutOfBounds,
    /// Struck non-walkable terrain
    HitTerrain,
    /// Struck a player
    HitPlayer,
    /// Exhausted its range
    RangeExhausted,
    /// Boomerang returned to its owner
    Returned,
    /// Match-end flush
    MatchEnd,
}

/// Status-effect kinds reported on the event stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Hard CC, blocks movement and casting
    Frozen,
    /// Hard CC, blocks movement
    Rooted,
    /// Soft CC, reduced move rate
    Slowed,
    /// Move-rate bonus
    SpeedBoost,
    /// Halved incoming damage
    Shield,
    /// Untargetable, CC-immune
    Phased,
    /// Damage over time
    Burning,
    /// Dragged toward a point
    Pulled,
    /// Dash move-rate override
    Dashing,
}

/// Combat event data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CombatEventData {
    /// A projectile entered the field
    ProjectileSpawned {
        /// Spawn-order id
        projectile_id: ProjectileId,
        /// Owning caster
        owner: PlayerId,
        /// Attack definition
        attack: AttackId,
        /// Spawn position
        position: Vec2,
        /// Unit direction
        direction: Vec2,
    },

    /// A projectile moved this tick
    ProjectileMoved {
        /// Spawn-order id
        projectile_id: ProjectileId,
        /// New position
        position: Vec2,
    },

    /// A projectile left the field
    ProjectileDespawned {
        /// Spawn-order id
        projectile_id: ProjectileId,
        /// Why it despawned
        reason: DespawnReason,
        /// Final position
        position: Vec2,
    },

    /// Damage was dealt
    DamageDealt {
        /// Source combatant
        attacker: PlayerId,
        /// Target combatant
        defender: PlayerId,
        /// Damage after mitigation
        amount: f32,
        /// Attack responsible, if projectile/area damage
        attack: Option<AttackId>,
    },

    /// A combatant died
    CombatantDied {
        /// The fallen
        victim: PlayerId,
        /// Kill credit, if any
        killer: Option<PlayerId>,
    },

    /// A status effect started
    StatusApplied {
        /// Affected combatant
        target: PlayerId,
        /// Effect kind
        status: StatusKind,
        /// Tick at which it ends
        until: u64,
    },

    /// A status effect lapsed this tick
    StatusExpired {
        /// Affected combatant
        target: PlayerId,
        /// Effect kind
        status: StatusKind,
    },

    /// A combatant's cell changed (movement, push, pull, teleport)
    CombatantMoved {
        /// Who moved
        player_id: PlayerId,
        /// New cell
        position: GridPos,
    },

    /// An area burst resolved (splash or explosion)
    AreaBurst {
        /// Originating attack
        attack: AttackId,
        /// Burst center
        center: Vec2,
        /// Burst radius
        radius: f32,
    },

    /// A cast intent was rejected (invalid input fails closed)
    CastRejected {
        /// The caster
        player_id: PlayerId,
        /// Requested attack
        attack: AttackId,
    },

    /// Match ended; all combat state was flushed
    MatchEnded {
        /// Final tick
        duration_ticks: u64,
    },
}

/// A combat event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Processing priority
    pub priority: EventPriority,

    /// Player involved (for tie-breaking)
    pub player_id: Option<PlayerId>,

    /// Event data
    pub data: CombatEventData,
}

impl CombatEvent {
    /// Create a new event.
    pub fn new(tick: u64, priority: EventPriority, data: CombatEventData) -> Self {
        let player_id = match &data {
            CombatEventData::ProjectileSpawned { owner, .. } => Some(*owner),
            CombatEventData::DamageDealt { defender, .. } => Some(*defender),
            CombatEventData::CombatantDied { victim, .. } => Some(*victim),
            CombatEventData::StatusApplied { target, .. } => Some(*target),
            CombatEventData::StatusExpired { target, .. } => Some(*target),
            CombatEventData::CombatantMoved { player_id, .. } => Some(*player_id),
            CombatEventData::CastRejected { player_id, .. } => Some(*player_id),
            _ => None,
        };

        Self {
            tick,
            priority,
            player_id,
            data,
        }
    }

    /// Create a projectile spawned event.
    pub fn projectile_spawned(
        tick: u64,
        projectile_id: ProjectileId,
        owner: PlayerId,
        attack: AttackId,
        position: Vec2,
        direction: Vec2,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Projectile,
            CombatEventData::ProjectileSpawned {
                projectile_id,
                owner,
                attack,
                position,
                direction,
            },
        )
    }

    /// Create a projectile moved event.
    pub fn projectile_moved(tick: u64, projectile_id: ProjectileId, position: Vec2) -> Self {
        Self::new(
            tick,
            EventPriority::Movement,
            CombatEventData::ProjectileMoved {
                projectile_id,
                position,
            },
        )
    }

    /// Create a projectile despawned event.
    pub fn projectile_despawned(
        tick: u64,
        projectile_id: ProjectileId,
        reason: DespawnReason,
        position: Vec2,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Projectile,
            CombatEventData::ProjectileDespawned {
                projectile_id,
                reason,
                position,
            },
        )
    }

    /// Create a damage event.
    pub fn damage_dealt(
        tick: u64,
        attacker: PlayerId,
        defender: PlayerId,
        amount: f32,
        attack: Option<AttackId>,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Damage,
            CombatEventData::DamageDealt {
                attacker,
                defender,
                amount,
                attack,
            },
        )
    }

    /// Create a death event.
    pub fn combatant_died(tick: u64, victim: PlayerId, killer: Option<PlayerId>) -> Self {
        Self::new(
            tick,
            EventPriority::Death,
            CombatEventData::CombatantDied { victim, killer },
        )
    }

    /// Create a status applied event.
    pub fn status_applied(tick: u64, target: PlayerId, status: StatusKind, until: u64) -> Self {
        Self::new(
            tick,
            EventPriority::Status,
            CombatEventData::StatusApplied {
                target,
                status,
                until,
            },
        )
    }

    /// Create a status expired event.
    pub fn status_expired(tick: u64, target: PlayerId, status: StatusKind) -> Self {
        Self::new(
            tick,
            EventPriority::Status,
            CombatEventData::StatusExpired { target, status },
        )
    }

    /// Create a combatant moved event.
    pub fn combatant_moved(tick: u64, player_id: PlayerId, position: GridPos) -> Self {
        Self::new(
            tick,
            EventPriority::Movement,
            CombatEventData::CombatantMoved {
                player_id,
                position,
            },
        )
    }

    /// Create an area burst event.
    pub fn area_burst(tick: u64, attack: AttackId, center: Vec2, radius: f32) -> Self {
        Self::new(
            tick,
            EventPriority::Projectile,
            CombatEventData::AreaBurst {
                attack,
                center,
                radius,
            },
        )
    }

    /// Create a cast rejected event.
    pub fn cast_rejected(tick: u64, player_id: PlayerId, attack: AttackId) -> Self {
        Self::new(
            tick,
            EventPriority::Other,
            CombatEventData::CastRejected { player_id, attack },
        )
    }

    /// Create a match ended event.
    pub fn match_ended(tick: u64) -> Self {
        Self::new(
            tick,
            EventPriority::Other,
            CombatEventData::MatchEnded {
                duration_ticks: tick,
            },
        )
    }
}

impl PartialEq for CombatEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.player_id == other.player_id
    }
}

impl Eq for CombatEvent {}

impl PartialOrd for CombatEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CombatEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then player_id
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.player_id.cmp(&other.player_id))
    }
}
