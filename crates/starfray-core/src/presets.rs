//! Preset roster used by [`CombatCatalog::default`](crate::catalog::CombatCatalog).
//!
//! Hosts with their own content replace this through `CombatCatalog::from_json`.

use std::collections::BTreeMap;

use crate::catalog::*;
use crate::enums::{Behavior, Reaction};

pub const WEAPON_PULSE_LASER: &str = "pulse_laser";
pub const WEAPON_AUTOCANNON: &str = "autocannon";
pub const WEAPON_SEEKER: &str = "seeker_missile";
pub const WEAPON_CUTTING_BEAM: &str = "cutting_beam";

pub const SHIP_FIGHTER: &str = "fighter";
pub const SHIP_CORVETTE: &str = "corvette";
pub const SHIP_FRIGATE: &str = "beam_frigate";
pub const SHIP_FREIGHTER: &str = "freighter";

pub const AI_RAIDER: &str = "raider";
pub const AI_MILITIA: &str = "militia";
pub const AI_PATROL: &str = "patrol";
pub const AI_TRADER: &str = "trader";
pub const AI_CIVILIAN: &str = "civilian";

pub const COMBAT_STANDARD: &str = "standard";
pub const COMBAT_BRAVE: &str = "brave";
pub const COMBAT_TIMID: &str = "timid";

/// Get the preset definition for a weapon key.
pub fn weapon_preset(key: &str) -> Option<WeaponDef> {
    let def = match key {
        WEAPON_PULSE_LASER => WeaponDef {
            kind: WeaponKind::Instant,
            damage: 10.0,
            fire_rate: 2.0,
            range: 600.0,
            projectile_speed: 900.0,
            accuracy: 0.9,
            max_error_deg: 6.0,
            homing: None,
        },
        WEAPON_AUTOCANNON => WeaponDef {
            kind: WeaponKind::Burst {
                shots: 3,
                sub_delay_ms: 80,
            },
            damage: 4.0,
            fire_rate: 1.0,
            range: 500.0,
            projectile_speed: 700.0,
            accuracy: 0.8,
            max_error_deg: 10.0,
            homing: None,
        },
        WEAPON_SEEKER => WeaponDef {
            kind: WeaponKind::Instant,
            damage: 30.0,
            fire_rate: 0.25,
            range: 1_200.0,
            projectile_speed: 300.0,
            accuracy: 0.95,
            max_error_deg: 4.0,
            homing: Some(HomingDef {
                turn_rate_deg: 120.0,
                retarget_interval_ms: 100,
                lifetime_ms: 6_000,
                backfire_deg: 30.0,
                bias_deg: 5.0,
                jitter_deg: 3.0,
                jitter_hz: 1.5,
            }),
        },
        WEAPON_CUTTING_BEAM => WeaponDef {
            kind: WeaponKind::Beam {
                refresh_ms: 500,
                duration_ms: 1_000,
                tick_interval_ms: 100,
                damage_per_tick: 5.0,
            },
            damage: 0.0,
            fire_rate: 1.0,
            range: 450.0,
            projectile_speed: 0.0,
            accuracy: 1.0,
            max_error_deg: 0.0,
            homing: None,
        },
        _ => return None,
    };
    Some(def)
}

pub fn ship_preset(key: &str) -> Option<ShipStats> {
    let (hp_max, hit_radius, accuracy, weapons): (f32, f32, f32, &[&str]) = match key {
        SHIP_FIGHTER => (60.0, 12.0, 0.9, &[WEAPON_PULSE_LASER, WEAPON_AUTOCANNON]),
        SHIP_CORVETTE => (150.0, 20.0, 0.85, &[WEAPON_PULSE_LASER, WEAPON_SEEKER]),
        SHIP_FRIGATE => (250.0, 28.0, 1.0, &[WEAPON_CUTTING_BEAM]),
        SHIP_FREIGHTER => (200.0, 30.0, 0.5, &[]),
        _ => return None,
    };
    Some(ShipStats {
        hp_max,
        hit_radius,
        accuracy,
        weapons: weapons.iter().map(|w| (*w).to_owned()).collect(),
    })
}

pub fn ai_profile_preset(key: &str) -> Option<AiProfile> {
    let hostile_only = ReactionTable {
        confrontation: Reaction::Attack,
        ..ReactionTable::default()
    };
    let profile = match key {
        AI_RAIDER => AiProfile {
            behavior: Behavior::Aggressive,
            radar_range: 1_500.0,
            non_combat: false,
            reactions: ReactionTable {
                cautious: Reaction::Attack,
                ..hostile_only
            },
        },
        AI_MILITIA => AiProfile {
            behavior: Behavior::Defensive,
            radar_range: 1_200.0,
            non_combat: false,
            reactions: hostile_only,
        },
        AI_PATROL => AiProfile {
            behavior: Behavior::Patrol,
            radar_range: 1_500.0,
            non_combat: false,
            reactions: hostile_only,
        },
        AI_TRADER => AiProfile {
            behavior: Behavior::Trader,
            radar_range: 1_000.0,
            non_combat: false,
            reactions: ReactionTable {
                confrontation: Reaction::Avoid,
                ..ReactionTable::default()
            },
        },
        AI_CIVILIAN => AiProfile {
            behavior: Behavior::Idle,
            radar_range: 800.0,
            non_combat: true,
            reactions: ReactionTable::default(),
        },
        _ => return None,
    };
    Some(profile)
}

pub fn combat_profile_preset(key: &str) -> Option<CombatProfile> {
    let (retreat_threshold, high_threat_cutoff) = match key {
        COMBAT_STANDARD => (0.25, 10.0),
        COMBAT_BRAVE => (0.1, 25.0),
        COMBAT_TIMID => (0.5, 5.0),
        _ => return None,
    };
    Some(CombatProfile {
        retreat_threshold,
        high_threat_cutoff,
    })
}

/// The full preset roster with default tuning.
pub fn standard_catalog() -> CombatCatalog {
    fn collect<T>(keys: &[&str], preset: fn(&str) -> Option<T>) -> BTreeMap<String, T> {
        keys.iter()
            .filter_map(|k| preset(k).map(|v| ((*k).to_owned(), v)))
            .collect()
    }

    CombatCatalog {
        ships: collect(
            &[SHIP_FIGHTER, SHIP_CORVETTE, SHIP_FRIGATE, SHIP_FREIGHTER],
            ship_preset,
        ),
        weapons: collect(
            &[
                WEAPON_PULSE_LASER,
                WEAPON_AUTOCANNON,
                WEAPON_SEEKER,
                WEAPON_CUTTING_BEAM,
            ],
            weapon_preset,
        ),
        ai_profiles: collect(
            &[AI_RAIDER, AI_MILITIA, AI_PATROL, AI_TRADER, AI_CIVILIAN],
            ai_profile_preset,
        ),
        combat_profiles: collect(
            &[COMBAT_STANDARD, COMBAT_BRAVE, COMBAT_TIMID],
            combat_profile_preset,
        ),
        tuning: Tuning::default(),
    }
}
