//! Hit & Effect Application
//!
//! Applies resolved projectile and area hits to the match state:
//! damage with mitigation, death bookkeeping, and dispatch of every
//! on-hit effect. Immunities are re-checked here at application time,
//! so a target that phased between resolution and application is
//! still protected.

use tracing::debug;

use crate::core::vec2::Vec2;
use crate::game::area::AreaHit;
use crate::game::catalog::{AttackDefinition, AttackId, OnHitEffect};
use crate::game::combatant::PlayerId;
use crate::game::events::{CombatEvent, StatusKind};
use crate::game::grid::GridPos;
use crate::game::state::{MatchState, VortexField};

/// How long a pull-to-caster drags its target, in ticks.
const PULL_DURATION_TICKS: u64 = 15;

/// Drag per tick while pulled, in cells.
const PULL_STEP_CELLS: f32 = 0.4;

/// Lifetime of a vortex field, in ticks.
const VORTEX_DURATION_TICKS: u64 = 90;

/// Apply a direct projectile hit: damage, death, then the attack's
/// on-hit effect with the post-mitigation damage for scaling.
pub fn apply_projectile_hit(
    state: &mut MatchState,
    attacker: PlayerId,
    defender: PlayerId,
    def: &AttackDefinition,
    raw_damage: f32,
    impact: Vec2,
) {
    let now = state.tick;

    let Some(target) = state.combatants.get_mut(&defender) else {
        return;
    };
    if !target.alive || target.is_phased(now) {
        return;
    }

    let dealt = target.apply_damage(now, raw_damage);
    let killed = !target.alive;

    if dealt > 0.0 {
        state.push_event(CombatEvent::damage_dealt(
            now,
            attacker,
            defender,
            dealt,
            Some(def.id),
        ));
    }
    if killed {
        record_death(state, defender, Some(attacker));
    }

    if let Some(effect) = def.on_hit {
        apply_on_hit(state, attacker, defender, def.id, effect, dealt, impact);
    }
}

/// Apply one target's share of an area burst: damage plus the burst's
/// freeze/root riders. On-hit effects do not ride along on bursts.
pub fn apply_area_hit(state: &mut MatchState, attacker: PlayerId, def: &AttackDefinition, hit: AreaHit) {
    let now = state.tick;

    let Some(target) = state.combatants.get_mut(&hit.defender) else {
        return;
    };
    if !target.alive || target.is_phased(now) {
        return;
    }

    let dealt = target.apply_damage(now, hit.damage);
    let killed = !target.alive;

    let mut status_events = Vec::new();
    if let Some(duration) = hit.freeze {
        if target.apply_freeze(now, duration) {
            status_events.push((StatusKind::Frozen, target.frozen_until));
        }
    }
    if let Some(duration) = hit.root {
        if target.apply_root(now, duration) {
            status_events.push((StatusKind::Rooted, target.root_until));
        }
    }

    if dealt > 0.0 {
        state.push_event(CombatEvent::damage_dealt(
            now,
            attacker,
            hit.defender,
            dealt,
            Some(def.id),
        ));
    }
    for (kind, until) in status_events {
        state.push_event(CombatEvent::status_applied(now, hit.defender, kind, until));
    }
    if killed {
        record_death(state, hit.defender, Some(attacker));
    }
}

/// Mark a combatant dead and emit the death event.
pub fn record_death(state: &mut MatchState, victim: PlayerId, killer: Option<PlayerId>) {
    let now = state.tick;
    if let Some(c) = state.combatants.get_mut(&victim) {
        c.eliminated_tick = Some(now);
        c.eliminated_by = killer;
    }
    state.push_event(CombatEvent::combatant_died(now, victim, killer));
    debug!(
        victim = %hex::encode(victim.as_bytes()),
        killer = killer.map(|k| hex::encode(k.as_bytes())),
        "combatant eliminated"
    );
}

/// Dispatch one on-hit effect. `dealt` is the post-mitigation damage of
/// the triggering hit, used by damage-scaled effects.
fn apply_on_hit(
    state: &mut MatchState,
    attacker: PlayerId,
    defender: PlayerId,
    attack: AttackId,
    effect: OnHitEffect,
    dealt: f32,
    impact: Vec2,
) {
    let now = state.tick;

    match effect {
        OnHitEffect::PullToCaster => {
            // The drag point is captured at hit time; the caster moving
            // afterwards does not bend the pull.
            let Some(toward) = state.combatants.get(&attacker).map(|c| c.center()) else {
                return;
            };
            let pulled = state.combatants.get_mut(&defender).map(|target| {
                target.apply_pull(toward, now, PULL_DURATION_TICKS, PULL_STEP_CELLS);
            });
            if pulled.is_some() {
                state.push_event(CombatEvent::status_applied(
                    now,
                    defender,
                    StatusKind::Pulled,
                    now + PULL_DURATION_TICKS,
                ));
            }
        }
        OnHitEffect::Freeze { duration } => {
            let until = state
                .combatants
                .get_mut(&defender)
                .and_then(|t| t.apply_freeze(now, duration).then_some(t.frozen_until));
            if let Some(until) = until {
                state.push_event(CombatEvent::status_applied(
                    now,
                    defender,
                    StatusKind::Frozen,
                    until,
                ));
            }
        }
        OnHitEffect::Push { distance } => {
            // Knockback radiates from where the projectile connected,
            // not from wherever the attacker stands now.
            push_combatant(state, defender, impact, distance);
        }
        OnHitEffect::TeleportBehind { distance, freeze } => {
            teleport_behind(state, attacker, defender, distance);
            if freeze > 0 {
                let until = state
                    .combatants
                    .get_mut(&defender)
                    .and_then(|t| t.apply_freeze(now, freeze).then_some(t.frozen_until));
                if let Some(until) = until {
                    state.push_event(CombatEvent::status_applied(
                        now,
                        defender,
                        StatusKind::Frozen,
                        until,
                    ));
                }
            }
        }
        OnHitEffect::LifeSteal { percent } => {
            let amount = dealt * (percent / 100.0);
            if amount > 0.0 {
                if let Some(caster) = state.combatants.get_mut(&attacker) {
                    caster.heal(amount);
                }
            }
        }
        OnHitEffect::Burn {
            total_damage,
            duration,
            tick_interval,
        } => {
            let applied = state.combatants.get_mut(&defender).map(|target| {
                target.apply_burn(now, attacker, total_damage, duration, tick_interval);
            });
            if applied.is_some() {
                state.push_event(CombatEvent::status_applied(
                    now,
                    defender,
                    StatusKind::Burning,
                    now + duration,
                ));
            }
        }
        OnHitEffect::VortexPull { radius, strength } => {
            let Some(center) = state.combatants.get(&defender).map(|c| c.center()) else {
                return;
            };
            state.vortexes.push(VortexField {
                owner: attacker,
                attack,
                center,
                radius,
                strength,
                expires_at: now + VORTEX_DURATION_TICKS,
            });
        }
        OnHitEffect::SpeedBoost { duration } => {
            let boosted = state.combatants.get_mut(&defender).map(|target| {
                target.apply_speed_boost(now, duration);
            });
            if boosted.is_some() {
                state.push_event(CombatEvent::status_applied(
                    now,
                    defender,
                    StatusKind::SpeedBoost,
                    now + duration,
                ));
            }
        }
        OnHitEffect::Root { duration } => {
            let until = state
                .combatants
                .get_mut(&defender)
                .and_then(|t| t.apply_root(now, duration).then_some(t.root_until));
            if let Some(until) = until {
                state.push_event(CombatEvent::status_applied(
                    now,
                    defender,
                    StatusKind::Rooted,
                    until,
                ));
            }
        }
        OnHitEffect::Slow { duration, factor } => {
            let until = state
                .combatants
                .get_mut(&defender)
                .and_then(|t| t.apply_slow(now, duration, factor).then_some(t.slowed_until));
            if let Some(until) = until {
                state.push_event(CombatEvent::status_applied(
                    now,
                    defender,
                    StatusKind::Slowed,
                    until,
                ));
            }
        }
    }
}

/// Shove `defender` away from `from`, cell by cell along the dominant
/// axis, stopping at the first blocked or occupied cell.
fn push_combatant(state: &mut MatchState, defender: PlayerId, from: Vec2, distance: u32) {
    let now = state.tick;
    let Some(target) = state.combatants.get(&defender) else {
        return;
    };
    let dir = quantize_axis(target.center().sub(from));
    if dir == (0, 0) {
        return;
    }

    let mut pos = target.position;
    for _ in 0..distance {
        let next = GridPos::new(pos.x + dir.0, pos.y + dir.1);
        if !state.grid.is_walkable(next) || cell_occupied(state, next, defender) {
            break;
        }
        pos = next;
    }

    let moved = state
        .combatants
        .get_mut(&defender)
        .filter(|t| pos != t.position)
        .map(|t| t.position = pos);
    if moved.is_some() {
        state.push_event(CombatEvent::combatant_moved(now, defender, pos));
    }
}

/// Relocate `attacker` to the nearest free cell behind `defender`,
/// searching from `distance` cells back inwards. Also turns the
/// attacker to face their victim.
fn teleport_behind(state: &mut MatchState, attacker: PlayerId, defender: PlayerId, distance: u32) {
    let now = state.tick;
    let Some(target) = state.combatants.get(&defender) else {
        return;
    };
    let behind = quantize_axis(-target.facing);
    let base = target.position;
    let target_center = target.center();
    if behind == (0, 0) {
        return;
    }

    let mut landing = None;
    for step in (1..=distance as i32).rev() {
        let cell = GridPos::new(base.x + behind.0 * step, base.y + behind.1 * step);
        if state.grid.is_walkable(cell) && !cell_occupied(state, cell, attacker) {
            landing = Some(cell);
            break;
        }
    }

    if let Some(cell) = landing {
        let moved = state.combatants.get_mut(&attacker).map(|caster| {
            caster.position = cell;
            caster.facing = target_center
                .sub(cell.center())
                .normalized_or(Vec2::RIGHT);
        });
        if moved.is_some() {
            state.push_event(CombatEvent::combatant_moved(now, attacker, cell));
        }
    }
}

/// Collapse a continuous direction onto its dominant grid axis.
pub(crate) fn quantize_axis(v: Vec2) -> (i32, i32) {
    if v.x == 0.0 && v.y == 0.0 {
        return (0, 0);
    }
    if v.x.abs() >= v.y.abs() {
        (if v.x >= 0.0 { 1 } else { -1 }, 0)
    } else {
        (0, if v.y >= 0.0 { 1 } else { -1 })
    }
}

/// Whether any living combatant other than `except` stands on `cell`.
pub(crate) fn cell_occupied(state: &MatchState, cell: GridPos, except: PlayerId) -> bool {
    state
        .combatants
        .values()
        .any(|c| c.id != except && c.alive && c.position == cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::{AttackCatalog, AttackId};
    use crate::game::combatant::CombatantStatus;
    use crate::game::events::CombatEventData;
    use crate::game::grid::{Tile, TileGrid};

    fn arena(pairs: &[(u8, i32, i32)]) -> (MatchState, Vec<PlayerId>) {
        let mut state = MatchState::new([9; 16], 1234, TileGrid::open(20, 20));
        let mut ids = Vec::new();
        for &(byte, x, y) in pairs {
            let id = PlayerId::new([byte; 16]);
            state
                .combatants
                .insert(id, CombatantStatus::new(id, GridPos::new(x, y)));
            ids.push(id);
        }
        (state, ids)
    }

    /// Contact point of a projectile arriving from the left.
    fn impact_on(state: &MatchState, defender: &PlayerId) -> Vec2 {
        state.combatants[defender].center().sub(Vec2::new(0.3, 0.0))
    }

    #[test]
    fn test_lethal_hit_records_death() {
        let (mut state, ids) = arena(&[(1, 2, 2), (2, 8, 2)]);
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();

        let at = impact_on(&state, &ids[1]);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 500.0, at);

        let victim = &state.combatants[&ids[1]];
        assert!(!victim.alive);
        assert_eq!(victim.eliminated_by, Some(ids[0]));
        assert_eq!(victim.eliminated_tick, Some(0));

        let events = state.take_events();
        assert!(matches!(
            events[0].data,
            CombatEventData::CombatantDied { .. }
        ));
    }

    #[test]
    fn test_lifesteal_scales_with_mitigated_damage() {
        let (mut state, ids) = arena(&[(1, 2, 2), (2, 8, 2)]);
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(20)).unwrap(); // leech dart, 50%

        state.combatants.get_mut(&ids[0]).unwrap().health = 50.0;
        state.combatants.get_mut(&ids[1]).unwrap().apply_shield(0, 600);

        let at = impact_on(&state, &ids[1]);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 20.0, at);

        // Shield halves to 10 dealt; 50% of that heals the caster
        assert_eq!(state.combatants[&ids[1]].health, 90.0);
        assert_eq!(state.combatants[&ids[0]].health, 55.0);
    }

    #[test]
    fn test_freeze_respects_cc_immunity() {
        let (mut state, ids) = arena(&[(1, 2, 2), (2, 8, 2)]);
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(7)).unwrap(); // frost shard

        state.combatants.get_mut(&ids[1]).unwrap().cc_immune_until = 1_000;

        let at = impact_on(&state, &ids[1]);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 5.0, at);

        assert!(!state.combatants[&ids[1]].is_frozen(1));
        let events = state.take_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e.data, CombatEventData::StatusApplied { .. })));
    }

    #[test]
    fn test_push_stops_at_wall() {
        let (mut state, ids) = arena(&[(1, 2, 5), (2, 4, 5)]);
        state.grid.set_tile(GridPos::new(6, 5), Tile::Wall).unwrap();
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(23)).unwrap(); // ram wave, push 2

        let at = impact_on(&state, &ids[1]);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 1.0, at);

        // Wanted 2 cells, wall at x=6 allows only 1
        assert_eq!(state.combatants[&ids[1]].position, GridPos::new(5, 5));
    }

    #[test]
    fn test_push_radiates_from_impact_point() {
        let (mut state, ids) = arena(&[(1, 8, 5), (2, 4, 5)]);
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(23)).unwrap(); // ram wave, push 2

        // Contact on the defender's left side shoves them rightward,
        // toward the attacker, not away from where the attacker stands.
        let at = Vec2::new(4.2, 5.5);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 1.0, at);

        assert_eq!(state.combatants[&ids[1]].position, GridPos::new(6, 5));
    }

    #[test]
    fn test_teleport_behind_places_and_faces() {
        let (mut state, ids) = arena(&[(1, 2, 5), (2, 10, 5)]);
        state.combatants.get_mut(&ids[1]).unwrap().facing = Vec2::RIGHT;
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(10)).unwrap(); // shadow step

        let at = impact_on(&state, &ids[1]);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 0.0, at);

        // Behind a right-facing target is one cell to the left
        let caster = &state.combatants[&ids[0]];
        assert_eq!(caster.position, GridPos::new(9, 5));
        assert!(caster.facing.x > 0.0);
        assert!(state.combatants[&ids[1]].is_frozen(1));
    }

    #[test]
    fn test_vortex_hit_registers_field() {
        let (mut state, ids) = arena(&[(1, 2, 5), (2, 10, 5)]);
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(19)).unwrap(); // vortex mine

        let at = impact_on(&state, &ids[1]);
        apply_projectile_hit(&mut state, ids[0], ids[1], def, 0.0, at);

        assert_eq!(state.vortexes.len(), 1);
        let field = &state.vortexes[0];
        assert_eq!(field.owner, ids[0]);
        assert_eq!(field.center, GridPos::new(10, 5).center());
        assert_eq!(field.expires_at, VORTEX_DURATION_TICKS);
    }

    #[test]
    fn test_area_hit_carries_root_rider() {
        let (mut state, ids) = arena(&[(1, 2, 5), (2, 10, 5)]);
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(12)).unwrap(); // ground slam

        apply_area_hit(
            &mut state,
            ids[0],
            def,
            AreaHit {
                defender: ids[1],
                damage: 10.0,
                freeze: None,
                root: Some(45),
            },
        );

        let target = &state.combatants[&ids[1]];
        assert_eq!(target.health, 90.0);
        assert!(target.is_rooted(44));
        assert!(!target.is_rooted(45));
    }
}
