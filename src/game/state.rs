//! Authoritative Match State
//!
//! The full simulation state for one match: the tile grid, the roster,
//! in-flight projectiles, active field effects, and the event queue
//! accumulated during the current tick. All collections are ordered so
//! iteration, and therefore the simulation, is deterministic.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::catalog::{AttackDefinition, AttackId};
use crate::game::combatant::{CombatantStatus, PlayerId};
use crate::game::events::{CombatEvent, DespawnReason, ProjectileId};
use crate::game::grid::{GridPos, TileGrid};
use crate::game::projectile::Projectile;

/// Errors from roster and state mutation.
#[derive(Debug, Error)]
pub enum StateError {
    /// Combatant id already present in the roster
    #[error("combatant already in match")]
    DuplicateCombatant,
    /// No free walkable cell left to spawn on
    #[error("no free spawn cell available")]
    SpawnExhausted,
}

/// A persistent pull field left on the ground (vortex mines).
#[derive(Clone, Debug)]
pub struct VortexField {
    /// Caster; immune to their own vortex
    pub owner: PlayerId,
    /// Attack that created the field
    pub attack: AttackId,
    /// Field center
    pub center: Vec2,
    /// Effect radius in cells
    pub radius: f32,
    /// Drag per tick toward the center, in cells
    pub strength: f32,
    /// Tick at which the field dissipates
    pub expires_at: u64,
}

/// Everything the simulation knows about one running match.
#[derive(Debug)]
pub struct MatchState {
    /// Match identifier, included in the seed derivation
    pub match_id: [u8; 16],
    /// Current simulation tick
    pub tick: u64,
    /// Seed this match's RNG was initialized from
    pub rng_seed: u64,
    /// Deterministic RNG; every draw is part of the simulation
    pub rng: DeterministicRng,
    /// The arena
    pub grid: TileGrid,
    /// Roster, keyed by player id for ordered iteration
    pub combatants: BTreeMap<PlayerId, CombatantStatus>,
    /// In-flight projectiles, keyed by spawn order
    pub projectiles: BTreeMap<ProjectileId, Projectile>,
    /// Active ground fields
    pub vortexes: Vec<VortexField>,
    /// Set once the match has been flushed
    pub ended: bool,
    next_projectile_id: ProjectileId,
    pending_events: Vec<CombatEvent>,
}

impl MatchState {
    /// Create a fresh match over `grid`, seeded with `seed`.
    pub fn new(match_id: [u8; 16], seed: u64, grid: TileGrid) -> Self {
        Self {
            match_id,
            tick: 0,
            rng_seed: seed,
            rng: DeterministicRng::new(seed),
            grid,
            combatants: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            vortexes: Vec::new(),
            ended: false,
            next_projectile_id: 0,
            pending_events: Vec::new(),
        }
    }

    /// Queue an event for this tick's result.
    pub fn push_event(&mut self, event: CombatEvent) {
        self.pending_events.push(event);
    }

    /// Drain this tick's events in deterministic processing order.
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        events.sort();
        events
    }

    /// Add a combatant at a random free walkable cell.
    pub fn add_combatant(&mut self, id: PlayerId) -> Result<GridPos, StateError> {
        if self.combatants.contains_key(&id) {
            return Err(StateError::DuplicateCombatant);
        }

        let mut free: Vec<GridPos> = self
            .grid
            .walkable_cells()
            .into_iter()
            .filter(|cell| !self.combatants.values().any(|c| c.alive && c.position == *cell))
            .collect();
        if free.is_empty() {
            return Err(StateError::SpawnExhausted);
        }

        let pick = self.rng.next_int(free.len() as u32) as usize;
        let spawn = free.swap_remove(pick);
        self.combatants.insert(id, CombatantStatus::new(id, spawn));
        debug!(player_id = %hex::encode(id.as_bytes()), ?spawn, "combatant spawned");
        Ok(spawn)
    }

    /// Living combatants remaining.
    pub fn alive_count(&self) -> usize {
        self.combatants.values().filter(|c| c.alive).count()
    }

    /// Spawn a projectile and emit its lifecycle event.
    pub fn spawn_projectile(
        &mut self,
        owner: PlayerId,
        def: &AttackDefinition,
        position: Vec2,
        direction: Vec2,
        charge: u8,
    ) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;

        let projectile = Projectile::new(id, owner, def, position, direction, charge);
        self.push_event(CombatEvent::projectile_spawned(
            self.tick, id, owner, def.id, position, direction,
        ));
        self.projectiles.insert(id, projectile);
        id
    }

    /// Remove a projectile and emit its despawn event.
    pub fn despawn_projectile(&mut self, id: ProjectileId, reason: DespawnReason) {
        if let Some(p) = self.projectiles.remove(&id) {
            self.push_event(CombatEvent::projectile_despawned(
                self.tick, id, reason, p.position,
            ));
        }
    }

    /// Flush the match: every projectile despawns, every field clears,
    /// and all status timers reset, so nothing carries past the end.
    pub fn end_match(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let in_flight: Vec<ProjectileId> = self.projectiles.keys().copied().collect();
        for id in in_flight {
            self.despawn_projectile(id, DespawnReason::MatchEnd);
        }
        self.vortexes.clear();
        for combatant in self.combatants.values_mut() {
            combatant.clear_status();
        }
        self.push_event(CombatEvent::match_ended(self.tick));
        debug!(
            match_id = %hex::encode(self.match_id),
            duration_ticks = self.tick,
            "match flushed"
        );
    }

    /// Hash the complete simulation state for divergence detection.
    ///
    /// Every field that influences future ticks is folded in; pending
    /// events are not, because they are derived output.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |h| {
            h.update_uuid(&self.match_id);
            h.update_u32(self.grid.width());
            h.update_u32(self.grid.height());

            h.update_u64(self.combatants.len() as u64);
            for combatant in self.combatants.values() {
                combatant.hash_into(h);
            }

            h.update_u64(self.projectiles.len() as u64);
            for p in self.projectiles.values() {
                h.update_u64(p.id);
                h.update_uuid(p.owner.as_bytes());
                h.update_u16(p.attack.0);
                h.update_vec2(p.position);
                h.update_vec2(p.direction);
                h.update_u8(p.charge);
                h.update_f32(p.distance_traveled);
                h.update_u8(p.remaining_pierces);
                h.update_u8(p.remaining_bounces);
                h.update_bool(p.returning);
                h.update_u64(p.hit_targets.len() as u64);
                for target in &p.hit_targets {
                    h.update_uuid(target.as_bytes());
                }
            }

            h.update_u64(self.vortexes.len() as u64);
            for v in &self.vortexes {
                h.update_uuid(v.owner.as_bytes());
                h.update_u16(v.attack.0);
                h.update_vec2(v.center);
                h.update_f32(v.radius);
                h.update_f32(v.strength);
                h.update_u64(v.expires_at);
            }

            h.update_u64(self.next_projectile_id);
            h.update_bool(self.ended);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::AttackCatalog;

    fn fresh_state() -> MatchState {
        MatchState::new([7; 16], 0xDEAD_BEEF, TileGrid::open(16, 16))
    }

    #[test]
    fn test_spawn_is_seed_deterministic() {
        let mut a = fresh_state();
        let mut b = fresh_state();
        let id = PlayerId::new([1; 16]);

        assert_eq!(a.add_combatant(id).unwrap(), b.add_combatant(id).unwrap());
    }

    #[test]
    fn test_duplicate_combatant_rejected() {
        let mut state = fresh_state();
        let id = PlayerId::new([1; 16]);
        state.add_combatant(id).unwrap();
        assert!(matches!(
            state.add_combatant(id),
            Err(StateError::DuplicateCombatant)
        ));
    }

    #[test]
    fn test_projectile_ids_monotonic() {
        let mut state = fresh_state();
        let owner = PlayerId::new([1; 16]);
        state.add_combatant(owner).unwrap();
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();

        let a = state.spawn_projectile(owner, def, Vec2::new(2.5, 2.5), Vec2::RIGHT, 0);
        let b = state.spawn_projectile(owner, def, Vec2::new(2.5, 2.5), Vec2::RIGHT, 0);
        assert!(b > a);
    }

    #[test]
    fn test_end_match_flushes_everything() {
        let mut state = fresh_state();
        let owner = PlayerId::new([1; 16]);
        state.add_combatant(owner).unwrap();
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        state.spawn_projectile(owner, def, Vec2::new(2.5, 2.5), Vec2::RIGHT, 0);
        state.combatants.get_mut(&owner).unwrap().apply_root(0, 300);

        state.tick = 42;
        state.end_match();

        assert!(state.projectiles.is_empty());
        assert!(state.vortexes.is_empty());
        assert!(!state.combatants[&owner].is_rooted(100));

        let events = state.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e.data, crate::game::events::CombatEventData::MatchEnded { .. })));
    }

    #[test]
    fn test_hash_changes_with_projectile_motion() {
        let mut state = fresh_state();
        let owner = PlayerId::new([1; 16]);
        state.add_combatant(owner).unwrap();
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        let id = state.spawn_projectile(owner, def, Vec2::new(2.5, 2.5), Vec2::RIGHT, 0);

        let before = state.compute_hash();
        state.projectiles.get_mut(&id).unwrap().position.x += 1.0;
        let after = state.compute_hash();

        assert_ne!(before, after);
    }
}
