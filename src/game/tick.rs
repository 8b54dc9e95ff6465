//! Simulation Tick
//!
//! One authoritative simulation step. Phases run in a fixed order and
//! every collection is iterated in key order, so two servers fed the
//! same intents produce bit-identical state:
//!
//! 1. Advance the clock
//! 2. Apply player intents (movement, then cast, per player)
//! 3. Integrate projectiles against the pre-step roster
//! 4. Apply resolved hits and bursts in spawn order
//! 5. Drag pulled combatants and apply vortex fields
//! 6. Tick burns
//! 7. Emit expiry events for timers ending this tick
//! 8. Regenerate health
//! 9. Check the last-standing condition
//!
//! A malformed intent is logged and dropped; the tick itself never
//! fails.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::hash::StateHash;
use crate::core::vec2::Vec2;
use crate::game::area::resolve_burst;
use crate::game::catalog::{AttackCatalog, AttackId};
use crate::game::cast::resolve_cast;
use crate::game::combatant::PlayerId;
use crate::game::effect::{
    apply_area_hit, apply_projectile_hit, cell_occupied, record_death,
};
use crate::game::events::{CombatEvent, DespawnReason, ProjectileId, StatusKind};
use crate::game::grid::GridPos;
use crate::game::projectile::StepResult;
use crate::game::state::MatchState;
use crate::TICK_RATE;

/// A movement direction on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDir {
    /// Negative y
    Up,
    /// Positive y
    Down,
    /// Negative x
    Left,
    /// Positive x
    Right,
}

impl MoveDir {
    /// Grid delta for one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
        }
    }

    /// Continuous facing vector.
    pub fn facing(self) -> Vec2 {
        let (dx, dy) = self.delta();
        Vec2::new(dx as f32, dy as f32)
    }
}

/// A cast request within an intent frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CastIntent {
    /// Attack to cast
    pub attack: AttackId,
    /// Aim direction; zero falls back to the caster's facing
    pub aim: Vec2,
    /// Charge level 0-100, clamped server-side
    pub charge: u8,
}

/// One player's input for one tick.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct IntentFrame {
    /// Requested movement, if any
    pub movement: Option<MoveDir>,
    /// Requested cast, if any
    pub cast: Option<CastIntent>,
}

/// Tunable simulation parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TickConfig {
    /// Passive health regeneration, per second
    pub regen_per_second: f32,
    /// End the match once at most one combatant remains alive
    pub end_when_last_standing: bool,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            regen_per_second: 1.0,
            end_when_last_standing: true,
        }
    }
}

/// Output of one simulation step.
#[derive(Debug)]
pub struct TickResult {
    /// The tick that was just simulated
    pub tick: u64,
    /// Everything that happened, in deterministic order
    pub events: Vec<CombatEvent>,
    /// Hash of the post-tick state for divergence detection
    pub state_hash: StateHash,
    /// The match ended during this tick
    pub match_over: bool,
}

/// Advance the match by exactly one tick.
pub fn tick(
    state: &mut MatchState,
    intents: &BTreeMap<PlayerId, IntentFrame>,
    catalog: &AttackCatalog,
    config: &TickConfig,
) -> TickResult {
    state.tick += 1;
    let now = state.tick;

    if !state.ended {
        apply_intents(state, intents, catalog);
        step_projectiles(state, catalog);
        apply_field_drag(state);
        tick_burns(state);
        emit_expirations(state);
        regenerate(state, config);

        if config.end_when_last_standing
            && state.combatants.len() >= 2
            && state.alive_count() <= 1
        {
            state.end_match();
        }
    }

    TickResult {
        tick: now,
        events: state.take_events(),
        state_hash: state.compute_hash(),
        match_over: state.ended,
    }
}

/// Phase 2: movement then cast, per player, in id order.
fn apply_intents(
    state: &mut MatchState,
    intents: &BTreeMap<PlayerId, IntentFrame>,
    catalog: &AttackCatalog,
) {
    let now = state.tick;

    for (&player_id, intent) in intents {
        if let Some(dir) = intent.movement {
            try_move(state, player_id, dir);
        }

        if let Some(cast) = intent.cast {
            if let Err(err) =
                resolve_cast(state, catalog, player_id, cast.attack, cast.aim, cast.charge)
            {
                warn!(
                    player_id = %hex::encode(player_id.as_bytes()),
                    attack = cast.attack.0,
                    %err,
                    "cast rejected"
                );
                state.push_event(CombatEvent::cast_rejected(now, player_id, cast.attack));
            }
        }
    }
}

/// One grid step, rate-limited by the combatant's move interval.
/// A blocked step still turns the combatant to face the attempt.
fn try_move(state: &mut MatchState, player_id: PlayerId, dir: MoveDir) {
    let now = state.tick;
    let Some(c) = state.combatants.get(&player_id) else {
        return;
    };
    if !c.movement_allowed(now) || now < c.next_move_tick {
        return;
    }

    let (dx, dy) = dir.delta();
    let next = GridPos::new(c.position.x + dx, c.position.y + dy);
    let interval = c.move_interval(now);
    let passable = state.grid.is_walkable(next) && !cell_occupied(state, next, player_id);

    let moved = state.combatants.get_mut(&player_id).map(|c| {
        c.facing = dir.facing();
        if passable {
            c.position = next;
            c.next_move_tick = now + interval;
        }
        passable
    });
    if moved == Some(true) {
        state.push_event(CombatEvent::combatant_moved(now, player_id, next));
    }
}

/// Phases 3 and 4: integrate every projectile against the pre-step
/// roster, then apply the collected hits in spawn order.
fn step_projectiles(state: &mut MatchState, catalog: &AttackCatalog) {
    let now = state.tick;

    let mut resolved: Vec<(ProjectileId, PlayerId, AttackId, StepResult)> = Vec::new();
    let mut orphaned: Vec<ProjectileId> = Vec::new();

    {
        let combatants = &state.combatants;
        let grid = &state.grid;
        for (&id, projectile) in state.projectiles.iter_mut() {
            let Some(def) = catalog.get(projectile.attack) else {
                warn!(projectile_id = id, attack = projectile.attack.0, "projectile attack missing from catalog");
                orphaned.push(id);
                continue;
            };
            let result = projectile.step(def, grid, combatants, now);
            resolved.push((id, projectile.owner, projectile.attack, result));
        }
    }

    for id in orphaned {
        state.despawn_projectile(id, DespawnReason::MatchEnd);
    }

    for (id, owner, attack, result) in resolved {
        let Some(def) = catalog.get(attack) else {
            continue;
        };

        for hit in &result.hits {
            apply_projectile_hit(state, owner, hit.defender, def, hit.damage, hit.impact);
        }
        for &center in &result.bursts {
            let radius = def
                .explosion
                .as_ref()
                .map(|e| e.radius)
                .or_else(|| def.splash.as_ref().map(|s| s.radius))
                .unwrap_or(0.0);
            state.push_event(CombatEvent::area_burst(now, attack, center, radius));
            for area_hit in resolve_burst(def, center, owner, &state.combatants, now) {
                apply_area_hit(state, owner, def, area_hit);
            }
        }

        match result.despawn {
            Some(reason) => state.despawn_projectile(id, reason),
            None => {
                let position = state.projectiles[&id].position;
                state.push_event(CombatEvent::projectile_moved(now, id, position));
            }
        }
    }
}

/// Phase 5: drag pulled combatants toward their captured point and
/// apply active vortex fields, then expire spent fields.
fn apply_field_drag(state: &mut MatchState) {
    let now = state.tick;

    let mut dragged: BTreeSet<PlayerId> = BTreeSet::new();

    // Per-combatant pulls first.
    let ids: Vec<PlayerId> = state.combatants.keys().copied().collect();
    for id in &ids {
        let drag = state.combatants.get(id).and_then(|c| {
            let pull = c.pull.as_ref()?;
            if !c.alive || now >= pull.until {
                return None;
            }
            Some((pull.toward, pull.step))
        });

        match drag {
            Some((toward, step)) => {
                dragged.insert(*id);
                drag_toward(state, *id, toward, step);
            }
            None => {
                let released = state
                    .combatants
                    .get_mut(id)
                    .map(|c| c.pull.take().is_some() && c.alive);
                if released == Some(true) {
                    state.push_event(CombatEvent::status_expired(now, *id, StatusKind::Pulled));
                }
            }
        }
    }

    // Then ground fields, in insertion order.
    let fields: Vec<(PlayerId, Vec2, f32, f32)> = state
        .vortexes
        .iter()
        .filter(|v| now < v.expires_at)
        .map(|v| (v.owner, v.center, v.radius, v.strength))
        .collect();
    for (owner, center, radius, strength) in fields {
        let radius_sq = radius * radius;
        let caught: Vec<PlayerId> = state
            .combatants
            .values()
            .filter(|c| {
                c.id != owner
                    && c.alive
                    && !c.is_phased(now)
                    && c.center().distance_squared(center) <= radius_sq
            })
            .map(|c| c.id)
            .collect();
        for id in caught {
            dragged.insert(id);
            drag_toward(state, id, center, strength);
        }
    }

    state.vortexes.retain(|v| now < v.expires_at);

    // Banked fractional progress does not survive a tick with no drag.
    for c in state.combatants.values_mut() {
        if !dragged.contains(&c.id) {
            c.drag_accumulator = 0.0;
        }
    }
}

/// Drag a combatant `step` cells toward `toward`. Positions are
/// cell-quantized, so sub-cell steps bank in the combatant's drag
/// accumulator and pay out as whole-cell moves, stopping at unwalkable
/// or occupied cells.
fn drag_toward(state: &mut MatchState, id: PlayerId, toward: Vec2, step: f32) {
    let Some(whole) = state.combatants.get_mut(&id).map(|c| {
        c.drag_accumulator += step.max(0.0);
        let whole = c.drag_accumulator.floor();
        c.drag_accumulator -= whole;
        whole as i32
    }) else {
        return;
    };

    for _ in 0..whole {
        let Some(c) = state.combatants.get(&id) else {
            return;
        };
        let center = c.center();
        let offset = toward.sub(center);
        if offset.length_squared() <= 1.0 {
            // One cell or closer; settle on the cell containing the
            // drag point.
            let cell = state.grid.cell_of(toward);
            move_if_free(state, id, cell);
            return;
        }

        let next_center = center.add(offset.normalized_or(Vec2::ZERO));
        let cell = state.grid.cell_of(next_center);
        move_if_free(state, id, cell);
    }
}

fn move_if_free(state: &mut MatchState, id: PlayerId, cell: GridPos) {
    let now = state.tick;
    if !state.grid.is_walkable(cell) || cell_occupied(state, cell, id) {
        return;
    }
    let moved = state
        .combatants
        .get_mut(&id)
        .filter(|c| c.position != cell)
        .map(|c| c.position = cell);
    if moved.is_some() {
        state.push_event(CombatEvent::combatant_moved(now, id, cell));
    }
}

/// Phase 6: periodic burn damage, attributed to the burn's source.
fn tick_burns(state: &mut MatchState) {
    let now = state.tick;
    let ids: Vec<PlayerId> = state.combatants.keys().copied().collect();

    for id in ids {
        let (due, expires) = match state.combatants.get(&id) {
            Some(c) if c.alive => match c.burn.as_ref() {
                Some(burn) => (
                    (now >= burn.last_tick + burn.tick_interval && now <= burn.until)
                        .then_some((burn.source, burn.damage_per_tick)),
                    now >= burn.until,
                ),
                None => (None, false),
            },
            _ => (None, false),
        };

        if let Some((source, damage)) = due {
            let dealt = state.combatants.get_mut(&id).map(|c| {
                if let Some(burn) = c.burn.as_mut() {
                    burn.last_tick = now;
                }
                let dealt = c.apply_damage(now, damage);
                (dealt, !c.alive)
            });
            if let Some((dealt, killed)) = dealt {
                if dealt > 0.0 {
                    state.push_event(CombatEvent::damage_dealt(now, source, id, dealt, None));
                }
                if killed {
                    record_death(state, id, Some(source));
                }
            }
        }

        if expires {
            if let Some(c) = state.combatants.get_mut(&id) {
                c.burn = None;
            }
            state.push_event(CombatEvent::status_expired(now, id, StatusKind::Burning));
        }
    }
}

/// Phase 7: expiry events for timers that end exactly this tick.
fn emit_expirations(state: &mut MatchState) {
    let now = state.tick;
    let mut expired: Vec<(PlayerId, StatusKind)> = Vec::new();

    for c in state.combatants.values() {
        let timers = [
            (c.frozen_until, StatusKind::Frozen),
            (c.root_until, StatusKind::Rooted),
            (c.slowed_until, StatusKind::Slowed),
            (c.speed_boost_until, StatusKind::SpeedBoost),
            (c.shield_until, StatusKind::Shield),
            (c.phased_until, StatusKind::Phased),
            (c.dash_until, StatusKind::Dashing),
        ];
        for (until, kind) in timers {
            if until == now {
                expired.push((c.id, kind));
            }
        }
    }

    for (id, kind) in expired {
        state.push_event(CombatEvent::status_expired(now, id, kind));
    }
}

/// Phase 8: passive regeneration, fractional amounts accumulated.
fn regenerate(state: &mut MatchState, config: &TickConfig) {
    if config.regen_per_second <= 0.0 {
        return;
    }
    let rate = config.regen_per_second / TICK_RATE as f32;
    for c in state.combatants.values_mut() {
        if c.alive {
            c.apply_regen(rate);
        }
    }
}
