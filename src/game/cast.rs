//! Cast Resolution
//!
//! Turns a validated cast intent into simulation effects: projectile
//! spawns, fans, self-buffs, dashes, teleports, and instant slams.
//! Aim direction falls back to the caster's facing when the intent
//! carries a zero vector, so a cast is never silently lost to bad
//! input.

use thiserror::Error;

use crate::core::vec2::Vec2;
use crate::game::area::resolve_burst;
use crate::game::catalog::{AttackCatalog, AttackDefinition, AttackId, BuffKind, CastBehavior};
use crate::game::combatant::PlayerId;
use crate::game::effect::{apply_area_hit, cell_occupied, quantize_axis};
use crate::game::events::{CombatEvent, StatusKind};
use crate::game::grid::GridPos;
use crate::game::state::MatchState;

/// Why a cast intent was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CastError {
    /// Attack id not present in the catalog
    #[error("unknown attack {0:?}")]
    UnknownAttack(AttackId),
    /// Caster not in the match roster
    #[error("unknown caster")]
    UnknownCaster,
    /// Caster is dead or frozen
    #[error("caster cannot act")]
    CasterCannotAct,
}

/// Resolve one cast for `caster` at the current tick.
///
/// Charge is clamped to 100; rooted casters may still cast, frozen and
/// dead ones may not.
pub fn resolve_cast(
    state: &mut MatchState,
    catalog: &AttackCatalog,
    caster: PlayerId,
    attack: AttackId,
    aim: Vec2,
    charge: u8,
) -> Result<(), CastError> {
    let now = state.tick;
    let def = catalog.get(attack).ok_or(CastError::UnknownAttack(attack))?;
    let charge = charge.min(100);

    let (origin, direction) = {
        let c = state
            .combatants
            .get_mut(&caster)
            .ok_or(CastError::UnknownCaster)?;
        if !c.casting_allowed(now) {
            return Err(CastError::CasterCannotAct);
        }
        let dir = aim.normalized_or(c.facing);
        c.facing = dir;
        (c.center(), dir)
    };

    match def.behavior {
        CastBehavior::Projectile => {
            state.spawn_projectile(caster, def, origin, direction, charge);
        }
        CastBehavior::Fan { count, spread } => {
            for angle in fan_angles(count, spread) {
                state.spawn_projectile(caster, def, origin, direction.rotated(angle), charge);
            }
        }
        CastBehavior::SelfBuff { buff, duration } => {
            apply_self_buff(state, caster, buff, duration);
        }
        CastBehavior::Dash {
            distance,
            duration,
            speed_mult,
        } => {
            dash(state, caster, direction, distance, duration, speed_mult);
        }
        CastBehavior::Teleport { max_distance } => {
            teleport(state, caster, direction, max_distance);
        }
        CastBehavior::GroundSlam => {
            slam(state, caster, def, origin);
        }
    }

    Ok(())
}

/// Evenly spaced rotation offsets across `spread`, centered on zero.
fn fan_angles(count: u8, spread: f32) -> Vec<f32> {
    if count <= 1 {
        return vec![0.0];
    }
    let step = spread / (count - 1) as f32;
    (0..count)
        .map(|i| -spread / 2.0 + step * i as f32)
        .collect()
}

fn apply_self_buff(state: &mut MatchState, caster: PlayerId, buff: BuffKind, duration: u64) {
    let now = state.tick;
    let kind = state.combatants.get_mut(&caster).map(|c| match buff {
        BuffKind::Speed => {
            c.apply_speed_boost(now, duration);
            StatusKind::SpeedBoost
        }
        BuffKind::Shield => {
            c.apply_shield(now, duration);
            StatusKind::Shield
        }
        BuffKind::Phase => {
            c.apply_phase(now, duration);
            StatusKind::Phased
        }
    });
    if let Some(kind) = kind {
        state.push_event(CombatEvent::status_applied(now, caster, kind, now + duration));
    }
}

/// Immediate displacement along the dominant axis of `direction`, up
/// to `distance` free cells, then a timed movement-rate override so
/// the dash momentum carries into subsequent move intents.
fn dash(
    state: &mut MatchState,
    caster: PlayerId,
    direction: Vec2,
    distance: u32,
    duration: u64,
    speed_mult: f32,
) {
    let now = state.tick;
    let Some(c) = state.combatants.get(&caster) else {
        return;
    };
    let axis = quantize_axis(direction);
    if axis == (0, 0) {
        return;
    }

    let mut pos = c.position;
    for _ in 0..distance {
        let next = GridPos::new(pos.x + axis.0, pos.y + axis.1);
        if !state.grid.is_walkable(next) || cell_occupied(state, next, caster) {
            break;
        }
        pos = next;
    }

    let moved = state.combatants.get_mut(&caster).map(|c| {
        let changed = pos != c.position;
        c.position = pos;
        c.apply_dash(now, duration, speed_mult);
        changed
    });
    state.push_event(CombatEvent::status_applied(
        now,
        caster,
        StatusKind::Dashing,
        now + duration,
    ));
    if moved == Some(true) {
        state.push_event(CombatEvent::combatant_moved(now, caster, pos));
    }
}

/// Blink to the furthest free walkable cell within `max_distance`
/// along the aim axis. Intervening walls are jumped over; a fully
/// blocked line leaves the caster in place.
fn teleport(state: &mut MatchState, caster: PlayerId, direction: Vec2, max_distance: u32) {
    let now = state.tick;
    let Some(c) = state.combatants.get(&caster) else {
        return;
    };
    let axis = quantize_axis(direction);
    if axis == (0, 0) {
        return;
    }
    let base = c.position;

    let mut landing = None;
    for step in 1..=max_distance as i32 {
        let cell = GridPos::new(base.x + axis.0 * step, base.y + axis.1 * step);
        if state.grid.is_walkable(cell) && !cell_occupied(state, cell, caster) {
            landing = Some(cell);
        }
    }

    if let Some(cell) = landing {
        if state.combatants.get_mut(&caster).map(|c| c.position = cell).is_some() {
            state.push_event(CombatEvent::combatant_moved(now, caster, cell));
        }
    }
}

/// Instant area burst centered on the caster.
fn slam(state: &mut MatchState, caster: PlayerId, def: &AttackDefinition, origin: Vec2) {
    let now = state.tick;
    let radius = def
        .explosion
        .as_ref()
        .map(|e| e.radius)
        .or_else(|| def.splash.as_ref().map(|s| s.radius))
        .unwrap_or(0.0);

    let hits = resolve_burst(def, origin, caster, &state.combatants, now);
    state.push_event(CombatEvent::area_burst(now, def.id, origin, radius));
    for hit in hits {
        apply_area_hit(state, caster, def, hit);
    }
}
