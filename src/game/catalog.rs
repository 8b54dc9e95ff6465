//! Attack Catalog
//!
//! Declarative definitions of every ability and weapon: kinematic and
//! effect parameters, area configurations, and charge/distance scaling
//! curves. The catalog is built once at startup and passed by reference
//! into the engine; definitions are immutable at runtime and looked up
//! by a small integer id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secs_to_ticks;

/// Stable attack identifier.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AttackId(pub u16);

/// Effect applied when a projectile (or area burst) connects.
///
/// Each variant is a pure description; `game::effect` interprets it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OnHitEffect {
    /// Drag the defender toward the caster over a short window.
    PullToCaster,
    /// Hard CC: no movement, no casting.
    Freeze {
        /// Duration in ticks
        duration: u64,
    },
    /// Knock the defender away from the impact point.
    Push {
        /// Displacement in cells
        distance: u32,
    },
    /// Relocate the caster behind the defender, then briefly freeze the
    /// defender.
    TeleportBehind {
        /// Cells behind the defender's facing
        distance: u32,
        /// Freeze applied after the teleport, in ticks
        freeze: u64,
    },
    /// Heal the attacker for a fraction of the damage dealt.
    LifeSteal {
        /// Percent of damage returned as healing (0-100)
        percent: f32,
    },
    /// Damage over time. Re-application overwrites the running burn.
    Burn {
        /// Total damage dealt over the full duration
        total_damage: f32,
        /// Duration in ticks
        duration: u64,
        /// Ticks between damage applications
        tick_interval: u64,
    },
    /// Field effect pulling everyone in radius toward the impact point.
    VortexPull {
        /// Field radius in cells
        radius: f32,
        /// Pull distance per tick, in cells
        strength: f32,
    },
    /// Movement-rate bonus on the target.
    SpeedBoost {
        /// Duration in ticks
        duration: u64,
    },
    /// Hard CC: no movement, casting allowed.
    Root {
        /// Duration in ticks
        duration: u64,
    },
    /// Soft CC: movement rate multiplied by `factor`.
    Slow {
        /// Duration in ticks
        duration: u64,
        /// Movement-rate multiplier in (0, 1)
        factor: f32,
    },
}

/// Self-buff kinds grantable by buff-type casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    /// Movement-rate bonus
    Speed,
    /// Halved incoming damage
    Shield,
    /// Untargetable and fully CC-immune
    Phase,
}

/// How a cast of this attack resolves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CastBehavior {
    /// Single projectile along the cast direction.
    Projectile,
    /// `count` projectiles spread evenly across `spread` radians.
    Fan {
        /// Number of projectiles
        count: u8,
        /// Total angular spread in radians
        spread: f32,
    },
    /// Timed buff on the caster; spawns nothing.
    SelfBuff {
        /// Which buff to grant
        buff: BuffKind,
        /// Duration in ticks
        duration: u64,
    },
    /// Burst of movement with a temporary move-rate override.
    Dash {
        /// Immediate displacement in cells
        distance: u32,
        /// Override duration in ticks
        duration: u64,
        /// Move-rate multiplier while active
        speed_mult: f32,
    },
    /// Instant relocation along the cast direction.
    Teleport {
        /// Maximum displacement in cells
        max_distance: u32,
    },
    /// Zero-range detonation centered on the caster, using the attack's
    /// splash/explosion config.
    GroundSlam,
}

/// Linear scaling curve sampled by charge level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChargeCurve {
    /// Value at charge 0
    pub min: f32,
    /// Value at charge 100
    pub max: f32,
}

impl ChargeCurve {
    /// Linear interpolation by `charge / 100`.
    #[inline]
    pub fn sample(&self, charge: u8) -> f32 {
        let t = (charge.min(100) as f32) / 100.0;
        self.min + (self.max - self.min) * t
    }
}

/// Linear damage scaling by distance traveled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceScaling {
    /// Damage at `max_range` and beyond
    pub max_damage: f32,
    /// Range over which damage scales from base to max
    pub max_range: f32,
}

/// Flat-damage area splash, optionally carrying a CC rider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplashConfig {
    /// Splash radius in cells
    pub radius: f32,
    /// Flat damage to everyone in radius
    pub damage: f32,
    /// Optional freeze duration in ticks
    #[serde(default)]
    pub freeze: Option<u64>,
    /// Optional root duration in ticks
    #[serde(default)]
    pub root: Option<u64>,
}

/// Explosion with damage falling off linearly from center to edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExplosionConfig {
    /// Damage at the blast center
    pub center_damage: f32,
    /// Damage at the blast radius boundary
    pub edge_damage: f32,
    /// Blast radius in cells
    pub radius: f32,
}

/// Immutable definition of one weapon or ability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttackDefinition {
    /// Stable identifier
    pub id: AttackId,
    /// Display name (logging only)
    pub name: String,
    /// Cast resolution behavior
    pub behavior: CastBehavior,
    /// Base displacement per tick, in cells
    pub speed: f32,
    /// Base direct-hit damage
    pub damage: f32,
    /// Base maximum travel range, in cells
    pub max_range: f32,
    /// Player collision radius, in cells
    pub hit_radius: f32,
    /// Projectile passes through players (never despawns on player hit)
    #[serde(default)]
    pub pass_players: bool,
    /// Projectile passes through walls and fences
    #[serde(default)]
    pub pass_walls: bool,
    /// Effect applied on a direct hit
    #[serde(default)]
    pub on_hit: Option<OnHitEffect>,
    /// Flat-damage area splash config
    #[serde(default)]
    pub splash: Option<SplashConfig>,
    /// Center-to-edge explosion config
    #[serde(default)]
    pub explosion: Option<ExplosionConfig>,
    /// Detonate the area config on wall/fence/player contact
    #[serde(default)]
    pub explodes_on_impact: bool,
    /// Detonate the area config when range is exhausted
    #[serde(default)]
    pub area_on_max_range: bool,
    /// Reverse once and return toward the owner
    #[serde(default)]
    pub boomerang: bool,
    /// Additional player hits before despawning
    #[serde(default)]
    pub pierce_count: u8,
    /// Wall reflections before despawning
    #[serde(default)]
    pub ricochet_count: u8,
    /// Speed as a function of charge
    #[serde(default)]
    pub charge_speed: Option<ChargeCurve>,
    /// Damage as a function of charge
    #[serde(default)]
    pub charge_damage: Option<ChargeCurve>,
    /// Range as a function of charge
    #[serde(default)]
    pub charge_range: Option<ChargeCurve>,
    /// Damage as a function of distance traveled. Takes precedence over
    /// `charge_damage` when both are present.
    #[serde(default)]
    pub distance_scaling: Option<DistanceScaling>,
}

impl AttackDefinition {
    /// Create a projectile attack with neutral defaults.
    pub fn new(id: u16, name: &str) -> Self {
        Self {
            id: AttackId(id),
            name: name.to_string(),
            behavior: CastBehavior::Projectile,
            speed: 1.0,
            damage: 0.0,
            max_range: 10.0,
            hit_radius: 0.5,
            pass_players: false,
            pass_walls: false,
            on_hit: None,
            splash: None,
            explosion: None,
            explodes_on_impact: false,
            area_on_max_range: false,
            boomerang: false,
            pierce_count: 0,
            ricochet_count: 0,
            charge_speed: None,
            charge_damage: None,
            charge_range: None,
            distance_scaling: None,
        }
    }

    /// Effective per-tick displacement for a given charge level.
    pub fn effective_speed(&self, charge: u8) -> f32 {
        match self.charge_speed {
            Some(curve) if charge > 0 => curve.sample(charge),
            _ => self.speed,
        }
    }

    /// Effective maximum range for a given charge level.
    pub fn effective_range(&self, charge: u8) -> f32 {
        match self.charge_range {
            Some(curve) if charge > 0 => curve.sample(charge),
            _ => self.max_range,
        }
    }

    /// Direct-hit damage for a given charge level and distance traveled.
    ///
    /// Distance scaling takes precedence over charge scaling. A zero
    /// scaling range short-circuits the fraction to 1.0 rather than
    /// dividing by zero.
    pub fn effective_damage(&self, charge: u8, distance: f32) -> f32 {
        if let Some(scaling) = self.distance_scaling {
            let frac = if scaling.max_range <= f32::EPSILON {
                1.0
            } else {
                (distance / scaling.max_range).min(1.0)
            };
            return self.damage + (scaling.max_damage - self.damage) * frac;
        }
        match self.charge_damage {
            Some(curve) if charge > 0 => curve.sample(charge),
            _ => self.damage,
        }
    }

    /// Zero-range attacks (speed 0) detonate in place and never despawn
    /// by range.
    #[inline]
    pub fn is_zero_range(&self) -> bool {
        self.speed == 0.0 && self.charge_speed.is_none()
    }
}

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two definitions share an id.
    #[error("Duplicate attack id {0:?}")]
    DuplicateId(AttackId),

    /// Catalog JSON could not be parsed.
    #[error("Malformed catalog file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Immutable lookup table of attack definitions.
///
/// Constructed once at startup and shared by reference; there is no
/// global registry.
#[derive(Clone, Debug, Default)]
pub struct AttackCatalog {
    attacks: BTreeMap<AttackId, AttackDefinition>,
}

impl AttackCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Ids must be unique.
    pub fn register(&mut self, def: AttackDefinition) -> Result<(), CatalogError> {
        if self.attacks.contains_key(&def.id) {
            return Err(CatalogError::DuplicateId(def.id));
        }
        self.attacks.insert(def.id, def);
        Ok(())
    }

    /// Look up a definition by id.
    #[inline]
    pub fn get(&self, id: AttackId) -> Option<&AttackDefinition> {
        self.attacks.get(&id)
    }

    /// Number of registered attacks.
    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    /// Iterate definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &AttackDefinition> {
        self.attacks.values()
    }

    /// Load additional definitions from a JSON array.
    pub fn load_json_str(&mut self, json: &str) -> Result<usize, CatalogError> {
        let defs: Vec<AttackDefinition> = serde_json::from_str(json)?;
        let count = defs.len();
        for def in defs {
            self.register(def)?;
        }
        Ok(count)
    }

    /// The builtin attack set.
    ///
    /// Covers every kinematic and effect archetype; production deploys
    /// extend it with `load_json_str`.
    pub fn builtin() -> Self {
        let mut cat = Self::new();
        for def in builtin_defs() {
            // Ids in builtin_defs are unique by construction
            let _ = cat.register(def);
        }
        cat
    }
}

fn builtin_defs() -> Vec<AttackDefinition> {
    let mut defs = Vec::new();

    // Plain projectile, the reference scenario weapon.
    let mut bolt = AttackDefinition::new(1, "arc bolt");
    bolt.damage = 20.0;
    bolt.max_range = 18.0;
    bolt.speed = 1.0;
    defs.push(bolt);

    let mut lance = AttackDefinition::new(2, "piercing lance");
    lance.damage = 14.0;
    lance.max_range = 14.0;
    lance.speed = 1.4;
    lance.pierce_count = 2;
    defs.push(lance);

    let mut orb = AttackDefinition::new(3, "ricochet orb");
    orb.damage = 12.0;
    orb.max_range = 12.0;
    orb.speed = 0.9;
    orb.ricochet_count = 3;
    defs.push(orb);

    let mut glaive = AttackDefinition::new(4, "boomerang glaive");
    glaive.damage = 16.0;
    glaive.max_range = 9.0;
    glaive.speed = 0.8;
    glaive.boomerang = true;
    defs.push(glaive);

    let mut beam = AttackDefinition::new(5, "charged beam");
    beam.damage = 10.0;
    beam.charge_speed = Some(ChargeCurve { min: 0.8, max: 2.0 });
    beam.charge_damage = Some(ChargeCurve {
        min: 10.0,
        max: 40.0,
    });
    beam.charge_range = Some(ChargeCurve {
        min: 8.0,
        max: 20.0,
    });
    defs.push(beam);

    let mut longshot = AttackDefinition::new(6, "longshot");
    longshot.damage = 10.0;
    longshot.max_range = 22.0;
    longshot.speed = 1.6;
    longshot.distance_scaling = Some(DistanceScaling {
        max_damage: 30.0,
        max_range: 15.0,
    });
    defs.push(longshot);

    let mut frost = AttackDefinition::new(7, "frost shard");
    frost.damage = 8.0;
    frost.max_range = 12.0;
    frost.on_hit = Some(OnHitEffect::Freeze {
        duration: secs_to_ticks(1.5),
    });
    defs.push(frost);

    let mut ember = AttackDefinition::new(8, "ember bolt");
    ember.damage = 6.0;
    ember.max_range = 14.0;
    ember.on_hit = Some(OnHitEffect::Burn {
        total_damage: 15.0,
        duration: secs_to_ticks(5.0),
        tick_interval: secs_to_ticks(0.5),
    });
    defs.push(ember);

    let mut hook = AttackDefinition::new(9, "grapple hook");
    hook.damage = 5.0;
    hook.max_range = 10.0;
    hook.speed = 1.8;
    hook.on_hit = Some(OnHitEffect::PullToCaster);
    defs.push(hook);

    let mut shadow = AttackDefinition::new(10, "shadow step");
    shadow.damage = 12.0;
    shadow.max_range = 8.0;
    shadow.speed = 1.4;
    shadow.on_hit = Some(OnHitEffect::TeleportBehind {
        distance: 1,
        freeze: secs_to_ticks(0.5),
    });
    defs.push(shadow);

    let mut mortar = AttackDefinition::new(11, "mortar shell");
    mortar.damage = 10.0;
    mortar.max_range = 16.0;
    mortar.speed = 0.7;
    mortar.explodes_on_impact = true;
    mortar.area_on_max_range = true;
    mortar.explosion = Some(ExplosionConfig {
        center_damage: 40.0,
        edge_damage: 10.0,
        radius: 3.0,
    });
    defs.push(mortar);

    let mut slam = AttackDefinition::new(12, "ground slam");
    slam.behavior = CastBehavior::GroundSlam;
    slam.speed = 0.0;
    slam.splash = Some(SplashConfig {
        radius: 3.0,
        damage: 10.0,
        freeze: None,
        root: Some(secs_to_ticks(1.0)),
    });
    defs.push(slam);

    let mut haste = AttackDefinition::new(13, "haste ward");
    haste.behavior = CastBehavior::SelfBuff {
        buff: BuffKind::Speed,
        duration: secs_to_ticks(4.0),
    };
    defs.push(haste);

    let mut aegis = AttackDefinition::new(14, "aegis ward");
    aegis.behavior = CastBehavior::SelfBuff {
        buff: BuffKind::Shield,
        duration: secs_to_ticks(3.0),
    };
    defs.push(aegis);

    let mut cloak = AttackDefinition::new(15, "phase cloak");
    cloak.behavior = CastBehavior::SelfBuff {
        buff: BuffKind::Phase,
        duration: secs_to_ticks(2.0),
    };
    defs.push(cloak);

    let mut blink = AttackDefinition::new(16, "blink");
    blink.behavior = CastBehavior::Teleport { max_distance: 6 };
    defs.push(blink);

    let mut surge = AttackDefinition::new(17, "surge");
    surge.behavior = CastBehavior::Dash {
        distance: 4,
        duration: secs_to_ticks(1.0),
        speed_mult: 2.0,
    };
    defs.push(surge);

    let mut fan = AttackDefinition::new(18, "fan of knives");
    fan.behavior = CastBehavior::Fan {
        count: 5,
        spread: std::f32::consts::FRAC_PI_3,
    };
    fan.damage = 7.0;
    fan.max_range = 8.0;
    fan.speed = 1.2;
    defs.push(fan);

    let mut vortex = AttackDefinition::new(19, "vortex mine");
    vortex.damage = 4.0;
    vortex.max_range = 10.0;
    vortex.speed = 0.6;
    vortex.on_hit = Some(OnHitEffect::VortexPull {
        radius: 4.0,
        strength: 0.5,
    });
    defs.push(vortex);

    let mut leech = AttackDefinition::new(20, "leech dart");
    leech.damage = 12.0;
    leech.max_range = 12.0;
    leech.on_hit = Some(OnHitEffect::LifeSteal { percent: 50.0 });
    defs.push(leech);

    let mut snare = AttackDefinition::new(21, "snare bolt");
    snare.damage = 6.0;
    snare.max_range = 12.0;
    snare.on_hit = Some(OnHitEffect::Root {
        duration: secs_to_ticks(1.5),
    });
    defs.push(snare);

    let mut hobble = AttackDefinition::new(22, "hobble dart");
    hobble.damage = 6.0;
    hobble.max_range = 12.0;
    hobble.on_hit = Some(OnHitEffect::Slow {
        duration: secs_to_ticks(3.0),
        factor: 0.5,
    });
    defs.push(hobble);

    let mut ram = AttackDefinition::new(23, "ram wave");
    ram.damage = 8.0;
    ram.max_range = 6.0;
    ram.on_hit = Some(OnHitEffect::Push { distance: 2 });
    defs.push(ram);

    let mut quicken = AttackDefinition::new(24, "quicken dart");
    quicken.damage = 0.0;
    quicken.max_range = 10.0;
    quicken.pass_walls = true;
    quicken.on_hit = Some(OnHitEffect::SpeedBoost {
        duration: secs_to_ticks(3.0),
    });
    defs.push(quicken);

    defs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_builtin_catalog_lookup() {
        let cat = AttackCatalog::builtin();
        assert!(cat.len() >= 20);
        assert!(cat.get(AttackId(1)).is_some());
        assert!(cat.get(AttackId(9999)).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut cat = AttackCatalog::new();
        cat.register(AttackDefinition::new(1, "a")).unwrap();
        assert!(matches!(
            cat.register(AttackDefinition::new(1, "b")),
            Err(CatalogError::DuplicateId(AttackId(1)))
        ));
    }

    #[test]
    fn test_charge_damage_endpoints() {
        let cat = AttackCatalog::builtin();
        let beam = cat.get(AttackId(5)).unwrap();
        let curve = beam.charge_damage.unwrap();

        // charge 0 falls back to base damage by contract; the curve
        // itself also starts at its min.
        assert_eq!(curve.sample(0), curve.min);
        assert_eq!(curve.sample(100), curve.max);
        assert_eq!(beam.effective_damage(100, 0.0), curve.max);
    }

    #[test]
    fn test_distance_damage_endpoints_and_clamp() {
        let cat = AttackCatalog::builtin();
        let longshot = cat.get(AttackId(6)).unwrap();
        let scaling = longshot.distance_scaling.unwrap();

        assert_eq!(longshot.effective_damage(0, 0.0), longshot.damage);
        assert_eq!(
            longshot.effective_damage(0, scaling.max_range),
            scaling.max_damage
        );
        // Beyond max range stays clamped
        assert_eq!(
            longshot.effective_damage(0, scaling.max_range * 2.0),
            scaling.max_damage
        );
    }

    #[test]
    fn test_distance_scaling_takes_precedence_over_charge() {
        let mut def = AttackDefinition::new(99, "both");
        def.damage = 10.0;
        def.charge_damage = Some(ChargeCurve {
            min: 10.0,
            max: 100.0,
        });
        def.distance_scaling = Some(DistanceScaling {
            max_damage: 20.0,
            max_range: 10.0,
        });

        // Full charge is ignored while distance scaling is present
        assert_eq!(def.effective_damage(100, 5.0), 15.0);
    }

    #[test]
    fn test_zero_scaling_range_is_safe() {
        let mut def = AttackDefinition::new(98, "degenerate");
        def.damage = 10.0;
        def.distance_scaling = Some(DistanceScaling {
            max_damage: 30.0,
            max_range: 0.0,
        });

        // Fraction short-circuits to 1.0 instead of dividing by zero
        assert_eq!(def.effective_damage(0, 0.0), 30.0);
        assert!(def.effective_damage(0, 5.0).is_finite());
    }

    #[test]
    fn test_catalog_json_load() {
        let json = r##"[{
            "id": 200,
            "name": "test spear",
            "behavior": {"kind": "projectile"},
            "speed": 1.0,
            "damage": 9.0,
            "max_range": 11.0,
            "hit_radius": 0.5,
            "pierce_count": 1,
            "on_hit": {"kind": "slow", "duration": 30, "factor": 0.6}
        }]"##;

        let mut cat = AttackCatalog::builtin();
        let added = cat.load_json_str(json).unwrap();
        assert_eq!(added, 1);

        let spear = cat.get(AttackId(200)).unwrap();
        assert_eq!(spear.pierce_count, 1);
        assert!(matches!(spear.on_hit, Some(OnHitEffect::Slow { .. })));
    }

    proptest! {
        #[test]
        fn prop_charge_damage_monotonic(lo in 0u8..=100, hi in 0u8..=100) {
            let curve = ChargeCurve { min: 10.0, max: 40.0 };
            let (lo, hi) = (lo.min(hi), lo.max(hi));
            prop_assert!(curve.sample(lo) <= curve.sample(hi));
        }

        #[test]
        fn prop_distance_damage_monotonic_and_clamped(d1 in 0.0f32..50.0, d2 in 0.0f32..50.0) {
            let mut def = AttackDefinition::new(97, "prop");
            def.damage = 10.0;
            def.distance_scaling = Some(DistanceScaling { max_damage: 30.0, max_range: 15.0 });

            let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            let dmg_near = def.effective_damage(0, near);
            let dmg_far = def.effective_damage(0, far);
            prop_assert!(dmg_near <= dmg_far + 1e-4);
            prop_assert!(dmg_far <= 30.0 + 1e-4);
        }
    }
}
