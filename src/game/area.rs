//! Area-of-Effect Resolution
//!
//! Splash and explosion bursts are resolved against a snapshot of the
//! roster: affected targets and their damage are computed first, then
//! handed to the effect engine for application, so a burst that kills
//! one target cannot change who else it reaches.

use std::collections::BTreeMap;

use crate::core::vec2::Vec2;
use crate::game::catalog::{AttackDefinition, ExplosionConfig, SplashConfig};
use crate::game::combatant::{CombatantStatus, PlayerId};

/// One combatant caught in an area burst.
#[derive(Clone, Copy, Debug)]
pub struct AreaHit {
    /// The affected combatant
    pub defender: PlayerId,
    /// Damage before mitigation
    pub damage: f32,
    /// Freeze duration carried by the burst, if any
    pub freeze: Option<u64>,
    /// Root duration carried by the burst, if any
    pub root: Option<u64>,
}

/// Resolve whichever burst shape the attack defines at `center`.
///
/// Explosions take precedence when an attack somehow defines both.
pub fn resolve_burst(
    def: &AttackDefinition,
    center: Vec2,
    owner: PlayerId,
    combatants: &BTreeMap<PlayerId, CombatantStatus>,
    now: u64,
) -> Vec<AreaHit> {
    if let Some(explosion) = &def.explosion {
        resolve_explosion(center, explosion, owner, combatants, now)
    } else if let Some(splash) = &def.splash {
        resolve_splash(center, splash, owner, combatants, now)
    } else {
        Vec::new()
    }
}

/// Flat-damage burst: every target within the radius takes the same
/// damage, with optional freeze/root riders.
pub fn resolve_splash(
    center: Vec2,
    cfg: &SplashConfig,
    owner: PlayerId,
    combatants: &BTreeMap<PlayerId, CombatantStatus>,
    now: u64,
) -> Vec<AreaHit> {
    targets_within(center, cfg.radius, owner, combatants, now)
        .map(|(id, _)| AreaHit {
            defender: id,
            damage: cfg.damage,
            freeze: cfg.freeze,
            root: cfg.root,
        })
        .collect()
}

/// Falloff burst: damage lerps from `center_damage` at the epicenter
/// down to `edge_damage` at the radius edge.
pub fn resolve_explosion(
    center: Vec2,
    cfg: &ExplosionConfig,
    owner: PlayerId,
    combatants: &BTreeMap<PlayerId, CombatantStatus>,
    now: u64,
) -> Vec<AreaHit> {
    targets_within(center, cfg.radius, owner, combatants, now)
        .map(|(id, dist)| {
            let frac = if cfg.radius <= f32::EPSILON {
                0.0
            } else {
                (dist / cfg.radius).clamp(0.0, 1.0)
            };
            AreaHit {
                defender: id,
                damage: cfg.center_damage + (cfg.edge_damage - cfg.center_damage) * frac,
                freeze: None,
                root: None,
            }
        })
        .collect()
}

/// Combatants inside the radius, owner and phased players excluded.
/// Iteration follows the roster's ordered keys.
fn targets_within<'a>(
    center: Vec2,
    radius: f32,
    owner: PlayerId,
    combatants: &'a BTreeMap<PlayerId, CombatantStatus>,
    now: u64,
) -> impl Iterator<Item = (PlayerId, f32)> + 'a {
    let radius_sq = radius * radius;
    combatants.values().filter_map(move |c| {
        if c.id == owner || !c.alive || c.is_phased(now) {
            return None;
        }
        let dist_sq = center.distance_squared(c.center());
        if dist_sq <= radius_sq {
            Some((c.id, dist_sq.sqrt()))
        } else {
            None
        }
    })
}
