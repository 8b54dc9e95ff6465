//! Combatant State
//!
//! Per-player mutable combat attributes: health, grid position, charge,
//! and the overlapping status-effect timers. All timers are match-clock
//! tick counters; an effect is active iff `now < until`, so expiry is an
//! implicit state read. Crowd control is not a strict state machine but
//! independent timers gated by one shared CC-immunity window.

use serde::{Deserialize, Serialize};

use crate::core::hash::StateHasher;
use crate::core::vec2::Vec2;
use crate::game::grid::GridPos;
use crate::CC_IMMUNITY_WINDOW_TICKS;

/// Base ticks between cell moves at normal speed (5 cells/sec at 30 Hz).
pub const BASE_MOVE_INTERVAL_TICKS: u64 = 6;

/// Move-rate multiplier while speed-boosted.
pub const SPEED_BOOST_MULT: f32 = 1.5;

/// Incoming-damage multiplier while shielded.
pub const SHIELD_DAMAGE_MULT: f32 = 0.5;

/// Default maximum health.
pub const DEFAULT_MAX_HEALTH: f32 = 100.0;

/// Unique player identifier (UUID as bytes).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create a fresh random id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Running damage-over-time state. A new burn overwrites the old one;
/// burns never stack.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BurnState {
    /// Tick at which the burn ends
    pub until: u64,
    /// Damage applied per burn tick
    pub damage_per_tick: f32,
    /// Ticks between burn applications
    pub tick_interval: u64,
    /// Tick of the last applied burn damage
    pub last_tick: u64,
    /// Who lit the fire (kill credit)
    pub source: PlayerId,
}

/// Active drag toward a point (grapple pull or vortex capture).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PullState {
    /// Point the combatant is dragged toward
    pub toward: Vec2,
    /// Tick at which the drag ends
    pub until: u64,
    /// Cells moved per tick (bounded step)
    pub step: f32,
}

/// State of a single combatant in the match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombatantStatus {
    /// Unique player ID
    pub id: PlayerId,

    /// Occupied grid cell
    pub position: GridPos,

    /// Unit facing direction (last move/cast direction)
    pub facing: Vec2,

    /// Current health
    pub health: f32,

    /// Maximum health
    pub max_health: f32,

    /// Charge level set at cast time (0-100)
    pub charge: u8,

    /// Is the combatant still alive?
    pub alive: bool,

    /// Tick of death, if dead
    pub eliminated_tick: Option<u64>,

    /// Killer, if any
    pub eliminated_by: Option<PlayerId>,

    // =========================================================================
    // Status timers (tick at which the effect ends; 0 = never granted)
    // =========================================================================
    /// Frozen: no movement, no casting
    pub frozen_until: u64,
    /// Rooted: no movement
    pub root_until: u64,
    /// Slowed: move interval divided by `slow_factor`
    pub slowed_until: u64,
    /// Movement-rate multiplier while slowed, in (0, 1)
    pub slow_factor: f32,
    /// Speed boost active until
    pub speed_boost_until: u64,
    /// Shield (halved incoming damage) active until
    pub shield_until: u64,
    /// Phased: untargetable and fully CC-immune
    pub phased_until: u64,
    /// Shared hard-CC immunity window
    pub cc_immune_until: u64,

    /// Running burn, if any
    pub burn: Option<BurnState>,

    /// Active drag, if any
    pub pull: Option<PullState>,

    /// Dash move-rate override active until
    pub dash_until: u64,
    /// Move-rate multiplier while dashing
    pub dash_speed_mult: f32,

    /// Fractional health regen carried across ticks
    pub regen_accumulator: f32,
    /// Fractional drag progress carried across ticks. Positions are
    /// cell-quantized, so sub-cell pull steps bank here until a whole
    /// cell of displacement is owed.
    pub drag_accumulator: f32,

    /// Earliest tick of the next cell move (movement pacing)
    pub next_move_tick: u64,
}

impl CombatantStatus {
    /// Create a combatant at a spawn cell with full health.
    pub fn new(id: PlayerId, position: GridPos) -> Self {
        Self {
            id,
            position,
            facing: Vec2::RIGHT,
            health: DEFAULT_MAX_HEALTH,
            max_health: DEFAULT_MAX_HEALTH,
            charge: 0,
            alive: true,
            eliminated_tick: None,
            eliminated_by: None,
            frozen_until: 0,
            root_until: 0,
            slowed_until: 0,
            slow_factor: 1.0,
            speed_boost_until: 0,
            shield_until: 0,
            phased_until: 0,
            cc_immune_until: 0,
            burn: None,
            pull: None,
            dash_until: 0,
            dash_speed_mult: 1.0,
            regen_accumulator: 0.0,
            drag_accumulator: 0.0,
            next_move_tick: 0,
        }
    }

    /// Center of the occupied cell in continuous coordinates.
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.position.center()
    }

    /// Frozen at `now`?
    #[inline]
    pub fn is_frozen(&self, now: u64) -> bool {
        now < self.frozen_until
    }

    /// Rooted at `now`?
    #[inline]
    pub fn is_rooted(&self, now: u64) -> bool {
        now < self.root_until
    }

    /// Slowed at `now`?
    #[inline]
    pub fn is_slowed(&self, now: u64) -> bool {
        now < self.slowed_until
    }

    /// Speed-boosted at `now`?
    #[inline]
    pub fn has_speed_boost(&self, now: u64) -> bool {
        now < self.speed_boost_until
    }

    /// Shielded at `now`?
    #[inline]
    pub fn is_shielded(&self, now: u64) -> bool {
        now < self.shield_until
    }

    /// Phased at `now`? Phase implies full hit and CC immunity.
    #[inline]
    pub fn is_phased(&self, now: u64) -> bool {
        now < self.phased_until
    }

    /// Dashing at `now`?
    #[inline]
    pub fn is_dashing(&self, now: u64) -> bool {
        now < self.dash_until
    }

    /// Inside the hard-CC immunity window at `now`?
    #[inline]
    pub fn is_cc_immune(&self, now: u64) -> bool {
        now < self.cc_immune_until
    }

    /// Can the combatant move this tick (ignoring move pacing)?
    #[inline]
    pub fn movement_allowed(&self, now: u64) -> bool {
        self.alive && !self.is_frozen(now) && !self.is_rooted(now)
    }

    /// Can the combatant cast this tick? Root allows casting, freeze
    /// does not.
    #[inline]
    pub fn casting_allowed(&self, now: u64) -> bool {
        self.alive && !self.is_frozen(now)
    }

    /// Ticks between cell moves at `now`, after slow/boost/dash
    /// multipliers. Never below one tick.
    pub fn move_interval(&self, now: u64) -> u64 {
        let mut rate = 1.0_f32;
        if self.is_slowed(now) {
            rate *= self.slow_factor.clamp(0.05, 1.0);
        }
        if self.has_speed_boost(now) {
            rate *= SPEED_BOOST_MULT;
        }
        if self.is_dashing(now) {
            rate *= self.dash_speed_mult.max(1.0);
        }
        ((BASE_MOVE_INTERVAL_TICKS as f32 / rate).round() as u64).max(1)
    }

    // =========================================================================
    // Status grants
    // =========================================================================

    /// Apply freeze. Rejected while phased or CC-immune. A successful
    /// grant extends CC-immunity to `effect end + immunity window`.
    pub fn apply_freeze(&mut self, now: u64, duration: u64) -> bool {
        if self.is_phased(now) || self.is_cc_immune(now) {
            return false;
        }
        self.frozen_until = now + duration;
        self.cc_immune_until = self.frozen_until + CC_IMMUNITY_WINDOW_TICKS;
        true
    }

    /// Apply root. Same gating and immunity extension as freeze.
    pub fn apply_root(&mut self, now: u64, duration: u64) -> bool {
        if self.is_phased(now) || self.is_cc_immune(now) {
            return false;
        }
        self.root_until = now + duration;
        self.cc_immune_until = self.root_until + CC_IMMUNITY_WINDOW_TICKS;
        true
    }

    /// Apply slow. Gated by phase and the immunity window, but does not
    /// extend it (only hard CC does).
    pub fn apply_slow(&mut self, now: u64, duration: u64, factor: f32) -> bool {
        if self.is_phased(now) || self.is_cc_immune(now) {
            return false;
        }
        self.slowed_until = now + duration;
        self.slow_factor = factor.clamp(0.05, 1.0);
        true
    }

    /// Grant a speed boost.
    pub fn apply_speed_boost(&mut self, now: u64, duration: u64) {
        self.speed_boost_until = now + duration;
    }

    /// Grant a shield.
    pub fn apply_shield(&mut self, now: u64, duration: u64) {
        self.shield_until = now + duration;
    }

    /// Grant phase. Active CC is cleared to hold the invariant that a
    /// phased combatant is never frozen, rooted, or slowed.
    pub fn apply_phase(&mut self, now: u64, duration: u64) {
        self.phased_until = now + duration;
        self.frozen_until = self.frozen_until.min(now);
        self.root_until = self.root_until.min(now);
        self.slowed_until = self.slowed_until.min(now);
    }

    /// Set or overwrite the running burn.
    pub fn apply_burn(&mut self, now: u64, source: PlayerId, total: f32, duration: u64, interval: u64) {
        let interval = interval.max(1);
        let tick_count = (duration / interval).max(1);
        self.burn = Some(BurnState {
            until: now + duration,
            damage_per_tick: total / tick_count as f32,
            tick_interval: interval,
            last_tick: now,
            source,
        });
    }

    /// Start a drag toward a point.
    pub fn apply_pull(&mut self, toward: Vec2, now: u64, duration: u64, step: f32) {
        self.pull = Some(PullState {
            toward,
            until: now + duration,
            step,
        });
    }

    /// Start a dash move-rate override.
    pub fn apply_dash(&mut self, now: u64, duration: u64, speed_mult: f32) {
        self.dash_until = now + duration;
        self.dash_speed_mult = speed_mult;
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Apply damage (shield-reduced when active). Returns the damage
    /// actually dealt; the caller observes death via `alive`.
    pub fn apply_damage(&mut self, now: u64, amount: f32) -> f32 {
        if !self.alive {
            return 0.0;
        }
        let dealt = if self.is_shielded(now) {
            amount * SHIELD_DAMAGE_MULT
        } else {
            amount
        };
        self.health = (self.health - dealt).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.alive = false;
            self.eliminated_tick = Some(now);
        }
        dealt
    }

    /// Heal up to max health.
    pub fn heal(&mut self, amount: f32) {
        if self.alive {
            self.health = (self.health + amount).min(self.max_health);
        }
    }

    /// Apply passive regeneration via the fractional accumulator, so a
    /// sub-unit per-tick rate carries across ticks without drift.
    pub fn apply_regen(&mut self, rate_per_tick: f32) {
        if !self.alive || self.health >= self.max_health {
            self.regen_accumulator = 0.0;
            return;
        }
        self.regen_accumulator += rate_per_tick;
        let whole = self.regen_accumulator.floor();
        if whole >= 1.0 {
            self.heal(whole);
            self.regen_accumulator -= whole;
        }
    }

    /// Reset all timers and transient effects (match-end flush).
    pub fn clear_status(&mut self) {
        self.frozen_until = 0;
        self.root_until = 0;
        self.slowed_until = 0;
        self.slow_factor = 1.0;
        self.speed_boost_until = 0;
        self.shield_until = 0;
        self.phased_until = 0;
        self.cc_immune_until = 0;
        self.burn = None;
        self.pull = None;
        self.dash_until = 0;
        self.dash_speed_mult = 1.0;
        self.regen_accumulator = 0.0;
        self.drag_accumulator = 0.0;
        self.charge = 0;
    }

    /// Hash this combatant's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_uuid(&self.id.0);
        hasher.update_i32(self.position.x);
        hasher.update_i32(self.position.y);
        hasher.update_vec2(self.facing);
        hasher.update_f32(self.health);
        hasher.update_u8(self.charge);
        hasher.update_bool(self.alive);
        hasher.update_u64(self.frozen_until);
        hasher.update_u64(self.root_until);
        hasher.update_u64(self.slowed_until);
        hasher.update_f32(self.slow_factor);
        hasher.update_u64(self.speed_boost_until);
        hasher.update_u64(self.shield_until);
        hasher.update_u64(self.phased_until);
        hasher.update_u64(self.cc_immune_until);
        if let Some(burn) = &self.burn {
            hasher.update_u64(burn.until);
            hasher.update_f32(burn.damage_per_tick);
            hasher.update_u64(burn.last_tick);
        }
        hasher.update_f32(self.regen_accumulator);
        hasher.update_f32(self.drag_accumulator);
    }
}
