//! Projectile Kinematics & Collision Resolution
//!
//! Advances each in-flight projectile, tests world and player collision,
//! and decides the outcome: continue, reflect, reverse, despawn, or area
//! burst. Integration is sub-stepped so fast projectiles cannot tunnel
//! through one-cell walls; terrain collision always resolves before
//! player collision within a step.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::catalog::{AttackDefinition, AttackId};
use crate::game::combatant::{CombatantStatus, PlayerId};
use crate::game::events::{DespawnReason, ProjectileId};
use crate::game::grid::TileGrid;

/// Maximum displacement per collision sub-step, in cells.
const MAX_SUBSTEP: f32 = 0.5;

/// Owner-proximity threshold at which a returning boomerang despawns.
const RETURN_ARRIVAL_RADIUS_SQ: f32 = 0.25;

/// A direct player hit resolved during one step.
#[derive(Clone, Copy, Debug)]
pub struct DirectHit {
    /// The struck combatant
    pub defender: PlayerId,
    /// Damage after charge/distance scaling, before mitigation
    pub damage: f32,
    /// Projectile position at the moment of contact
    pub impact: Vec2,
}

/// Everything one projectile produced in one simulation tick.
#[derive(Debug, Default)]
pub struct StepResult {
    /// Player hits in resolution order
    pub hits: Vec<DirectHit>,
    /// Area-burst centers triggered this step
    pub bursts: Vec<Vec2>,
    /// Set when the projectile leaves the field this tick
    pub despawn: Option<DespawnReason>,
}

/// One in-flight projectile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Projectile {
    /// Spawn-order id (also the simultaneous-hit tie-break key)
    pub id: ProjectileId,
    /// Owning caster; never present in `hit_targets`
    pub owner: PlayerId,
    /// Attack definition id
    pub attack: AttackId,
    /// Continuous position
    pub position: Vec2,
    /// Unit direction
    pub direction: Vec2,
    /// Charge level at cast time (0-100)
    pub charge: u8,
    /// Accumulated distance traveled; resets on reflection, not pierce
    pub distance_traveled: f32,
    /// Already-hit targets (pierce / no-double-hit bookkeeping)
    pub hit_targets: BTreeSet<PlayerId>,
    /// Additional player hits left before despawning
    pub remaining_pierces: u8,
    /// Wall reflections left; monotonically decreases
    pub remaining_bounces: u8,
    /// Boomerang has reversed and is heading home
    pub returning: bool,
}

impl Projectile {
    /// Create a projectile at its spawn position.
    pub fn new(
        id: ProjectileId,
        owner: PlayerId,
        def: &AttackDefinition,
        position: Vec2,
        direction: Vec2,
        charge: u8,
    ) -> Self {
        Self {
            id,
            owner,
            attack: def.id,
            position,
            direction,
            charge,
            distance_traveled: 0.0,
            hit_targets: BTreeSet::new(),
            remaining_pierces: def.pierce_count,
            remaining_bounces: def.ricochet_count,
            returning: false,
        }
    }

    /// Advance one simulation tick.
    ///
    /// `combatants` is the live player snapshot; hits are recorded here
    /// and applied by the effect engine afterwards.
    pub fn step(
        &mut self,
        def: &AttackDefinition,
        grid: &TileGrid,
        combatants: &BTreeMap<PlayerId, CombatantStatus>,
        now: u64,
    ) -> StepResult {
        let mut result = StepResult::default();

        let speed = def.effective_speed(self.charge);
        if speed <= 0.0 {
            // Zero-range attacks detonate in place via their cast
            // behavior; nothing to integrate.
            return result;
        }

        let substeps = (speed / MAX_SUBSTEP).ceil().max(1.0) as u32;
        let step_len = speed / substeps as f32;

        for _ in 0..substeps {
            let dx = self.direction.x * step_len;
            let dy = self.direction.y * step_len;
            let next = self.position.add(Vec2::new(dx, dy));
            let next_cell = grid.cell_of(next);

            // Bounds check: outside the world, gone without effect.
            if !grid.in_bounds(next_cell) {
                self.position = next;
                result.despawn = Some(DespawnReason::OutOfBounds);
                return result;
            }

            // Terrain check, resolved before any player contact.
            if !grid.is_walkable(next_cell) && !def.pass_walls {
                if self.remaining_bounces > 0 {
                    self.reflect(grid, dx, dy);
                    continue;
                }
                if def.boomerang && !self.returning {
                    self.reverse();
                    continue;
                }
                if def.explodes_on_impact {
                    result.bursts.push(next_cell.center());
                }
                result.despawn = Some(DespawnReason::HitTerrain);
                return result;
            }

            self.position = next;
            self.distance_traveled += step_len;

            // Player collision against the live snapshot.
            if !def.pass_players {
                let hit_radius_sq = def.hit_radius * def.hit_radius;
                let struck = combatants.values().find(|c| {
                    c.id != self.owner
                        && c.alive
                        && !c.is_phased(now)
                        && !self.hit_targets.contains(&c.id)
                        && self.position.distance_squared(c.center()) <= hit_radius_sq
                });

                if let Some(target) = struck {
                    let target_id = target.id;
                    let target_center = target.center();
                    self.hit_targets.insert(target_id);
                    result.hits.push(DirectHit {
                        defender: target_id,
                        damage: def.effective_damage(self.charge, self.distance_traveled),
                        impact: self.position,
                    });

                    if def.explodes_on_impact {
                        result.bursts.push(target_center);
                    }

                    if self.remaining_pierces > 0 {
                        self.remaining_pierces -= 1;
                        // Continue flight; distance is NOT reset on pierce
                    } else if def.boomerang && !self.returning {
                        self.reverse();
                        continue;
                    } else {
                        result.despawn = Some(DespawnReason::HitPlayer);
                        return result;
                    }
                }
            }

            // Returning boomerangs despawn on owner proximity.
            if self.returning {
                if let Some(owner) = combatants.get(&self.owner) {
                    if owner.alive
                        && self.position.distance_squared(owner.center())
                            <= RETURN_ARRIVAL_RADIUS_SQ
                    {
                        result.despawn = Some(DespawnReason::Returned);
                        return result;
                    }
                }
            }

            // Range check.
            let max_range = def.effective_range(self.charge);
            if self.distance_traveled >= max_range {
                if def.boomerang && !self.returning {
                    self.reverse();
                    continue;
                }
                if def.area_on_max_range {
                    result.bursts.push(self.position);
                }
                result.despawn = Some(DespawnReason::RangeExhausted);
                return result;
            }
        }

        result
    }

    /// Reflect off terrain: test the x-only and y-only sub-moves
    /// independently and invert whichever component would cross a wall.
    /// When the blocker cannot be isolated, invert both axes.
    fn reflect(&mut self, grid: &TileGrid, dx: f32, dy: f32) {
        let x_cell = grid.cell_of(self.position.add(Vec2::new(dx, 0.0)));
        let y_cell = grid.cell_of(self.position.add(Vec2::new(0.0, dy)));
        let x_blocked = !grid.is_walkable(x_cell);
        let y_blocked = !grid.is_walkable(y_cell);

        match (x_blocked, y_blocked) {
            (true, false) => self.direction.x = -self.direction.x,
            (false, true) => self.direction.y = -self.direction.y,
            // Corner hit or undetectable blocker: conservative default
            _ => {
                self.direction.x = -self.direction.x;
                self.direction.y = -self.direction.y;
            }
        }

        self.remaining_bounces -= 1;
        self.distance_traveled = 0.0;
    }

    /// Boomerang reversal: flip direction once and head home. Distance
    /// resets like a reflection so the return leg gets full range.
    fn reverse(&mut self) {
        self.direction = -self.direction;
        self.returning = true;
        self.distance_traveled = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::AttackCatalog;
    use crate::game::grid::{GridPos, Tile};

    fn open_grid() -> TileGrid {
        TileGrid::open(24, 24)
    }

    fn combatant_at(byte: u8, x: i32, y: i32) -> CombatantStatus {
        CombatantStatus::new(PlayerId::new([byte; 16]), GridPos::new(x, y))
    }

    fn roster(list: Vec<CombatantStatus>) -> BTreeMap<PlayerId, CombatantStatus> {
        list.into_iter().map(|c| (c.id, c)).collect()
    }

    fn fly_until_done(
        p: &mut Projectile,
        def: &AttackDefinition,
        grid: &TileGrid,
        combatants: &BTreeMap<PlayerId, CombatantStatus>,
    ) -> (Vec<DirectHit>, Vec<Vec2>, DespawnReason) {
        let mut hits = Vec::new();
        let mut bursts = Vec::new();
        for tick in 0..10_000 {
            let result = p.step(def, grid, combatants, tick);
            hits.extend(result.hits);
            bursts.extend(result.bursts);
            if let Some(reason) = result.despawn {
                return (hits, bursts, reason);
            }
        }
        panic!("projectile never despawned");
    }

    #[test]
    fn test_direct_hit_scenario_base_damage() {
        // baseDamage=20, maxRange=18, speed=1.0 at a target 5 cells away
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        let grid = open_grid();

        let owner = combatant_at(1, 2, 5);
        let target = combatant_at(2, 7, 5);
        let roster = roster(vec![owner.clone(), target]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert_eq!(reason, DespawnReason::HitPlayer);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].defender, PlayerId::new([2; 16]));
        assert_eq!(hits[0].damage, 20.0);
    }

    #[test]
    fn test_never_hits_owner_or_double_hits() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(2)).unwrap(); // pierce 2
        let grid = open_grid();

        let owner = combatant_at(1, 2, 5);
        let target = combatant_at(2, 6, 5);
        let roster = roster(vec![owner.clone(), target]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, _) = fly_until_done(&mut p, def, &grid, &roster);

        // Pierces through, but the same target is only ever hit once
        assert_eq!(hits.len(), 1);
        assert!(!p.hit_targets.contains(&owner.id));
    }

    #[test]
    fn test_pierce_despawns_after_n_plus_one_hits() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(2)).unwrap();
        assert_eq!(def.pierce_count, 2);
        let grid = open_grid();

        let owner = combatant_at(1, 1, 5);
        let targets = vec![
            combatant_at(2, 4, 5),
            combatant_at(3, 6, 5),
            combatant_at(4, 8, 5),
            combatant_at(5, 10, 5),
        ];
        let mut all = vec![owner.clone()];
        all.extend(targets);
        let roster = roster(all);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, reason) = fly_until_done(&mut p, def, &grid, &roster);

        // Pierce 2 means exactly 3 hits; the 4th target is never reached
        assert_eq!(hits.len(), 3);
        assert_eq!(reason, DespawnReason::HitPlayer);
    }

    #[test]
    fn test_wall_despawns_plain_projectile() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        let mut grid = open_grid();
        grid.set_tile(GridPos::new(8, 5), Tile::Wall).unwrap();

        let owner = combatant_at(1, 2, 5);
        let roster = roster(vec![owner.clone()]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert!(hits.is_empty());
        assert_eq!(reason, DespawnReason::HitTerrain);
    }

    #[test]
    fn test_wall_cannot_shield_player_in_same_step() {
        // Wall directly in front of the target: terrain resolves first
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        let mut grid = open_grid();
        grid.set_tile(GridPos::new(7, 5), Tile::Wall).unwrap();

        let owner = combatant_at(1, 2, 5);
        let target = combatant_at(2, 8, 5);
        let roster = roster(vec![owner.clone(), target]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert!(hits.is_empty());
        assert_eq!(reason, DespawnReason::HitTerrain);
    }

    #[test]
    fn test_pass_walls_ignores_terrain() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(24)).unwrap(); // quicken dart, pass_walls
        let mut grid = open_grid();
        grid.set_tile(GridPos::new(5, 5), Tile::Wall).unwrap();

        let owner = combatant_at(1, 2, 5);
        let target = combatant_at(2, 8, 5);
        let roster = roster(vec![owner.clone(), target]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, _) = fly_until_done(&mut p, def, &grid, &roster);

        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_ricochet_bounces_strictly_decrease() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(3)).unwrap();
        assert_eq!(def.ricochet_count, 3);
        // Corridor sealed at both ends: the orb must bounce until
        // exhausted, then despawn on the next wall.
        let mut grid = open_grid();
        for y in 0..24 {
            grid.set_tile(GridPos::new(0, y), Tile::Wall).unwrap();
            grid.set_tile(GridPos::new(12, y), Tile::Wall).unwrap();
        }

        let owner = combatant_at(1, 2, 5);
        let roster = roster(vec![owner.clone()]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);

        let mut seen_bounces = vec![p.remaining_bounces];
        let mut reason = None;
        for tick in 0..10_000 {
            let result = p.step(def, &grid, &roster, tick);
            if *seen_bounces.last().unwrap() != p.remaining_bounces {
                seen_bounces.push(p.remaining_bounces);
            }
            if let Some(r) = result.despawn {
                reason = Some(r);
                break;
            }
        }

        assert_eq!(seen_bounces, vec![3, 2, 1, 0]);
        assert_eq!(reason, Some(DespawnReason::HitTerrain));
    }

    #[test]
    fn test_reflection_resets_distance() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(3)).unwrap();
        let mut grid = open_grid();
        for y in 0..24 {
            grid.set_tile(GridPos::new(8, y), Tile::Wall).unwrap();
        }

        let owner = combatant_at(1, 2, 5);
        let roster = roster(vec![owner.clone()]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        for tick in 0..8 {
            p.step(def, &grid, &roster, tick);
        }

        // After the first bounce the odometer restarted
        assert!(p.remaining_bounces < 3);
        assert!(p.distance_traveled < 3.0);
        assert!(p.direction.x < 0.0);
    }

    #[test]
    fn test_boomerang_reverses_and_returns_to_owner() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(4)).unwrap();
        assert!(def.boomerang);
        let grid = open_grid();

        let owner = combatant_at(1, 4, 5);
        let roster = roster(vec![owner.clone()]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (_, _, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert!(p.returning);
        assert_eq!(reason, DespawnReason::Returned);
    }

    #[test]
    fn test_out_of_bounds_despawn_no_effect() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        let grid = open_grid();

        let owner = combatant_at(1, 22, 5);
        let roster = roster(vec![owner.clone()]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, bursts, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert!(hits.is_empty());
        assert!(bursts.is_empty());
        assert_eq!(reason, DespawnReason::OutOfBounds);
    }

    #[test]
    fn test_phased_target_not_hit() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(1)).unwrap();
        let grid = open_grid();

        let owner = combatant_at(1, 2, 5);
        let mut target = combatant_at(2, 7, 5);
        target.apply_phase(0, 1_000_000);
        let roster = roster(vec![owner.clone(), target]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, _, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert!(hits.is_empty());
        assert_eq!(reason, DespawnReason::RangeExhausted);
    }

    #[test]
    fn test_area_on_max_range_bursts_at_final_position() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(11)).unwrap(); // mortar shell
        assert!(def.area_on_max_range);
        let grid = open_grid();

        let owner = combatant_at(1, 2, 12);
        let roster = roster(vec![owner.clone()]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (_, bursts, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert_eq!(reason, DespawnReason::RangeExhausted);
        assert_eq!(bursts.len(), 1);
        assert!((bursts[0].x - owner.center().x) >= def.max_range - 1.0);
    }

    #[test]
    fn test_explodes_on_player_impact() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(11)).unwrap();
        let grid = open_grid();

        let owner = combatant_at(1, 2, 5);
        let target = combatant_at(2, 7, 5);
        let roster = roster(vec![owner.clone(), target]);

        let mut p = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 0);
        let (hits, bursts, reason) = fly_until_done(&mut p, def, &grid, &roster);

        assert_eq!(reason, DespawnReason::HitPlayer);
        assert_eq!(hits.len(), 1);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0], GridPos::new(7, 5).center());
    }

    #[test]
    fn test_charge_speed_scales_displacement() {
        let cat = AttackCatalog::builtin();
        let def = cat.get(AttackId(5)).unwrap(); // charged beam
        let grid = open_grid();
        let owner = combatant_at(1, 2, 5);
        let roster = roster(vec![owner.clone()]);

        let mut slow = Projectile::new(0, owner.id, def, owner.center(), Vec2::RIGHT, 1);
        let mut fast = Projectile::new(1, owner.id, def, owner.center(), Vec2::RIGHT, 100);

        slow.step(def, &grid, &roster, 0);
        fast.step(def, &grid, &roster, 0);

        assert!(fast.position.x > slow.position.x);
    }
}
