//! Read-only combat configuration: ships, weapons, AI/combat profiles, tuning.
//!
//! Hosts usually load the catalog from JSON ([`CombatCatalog::from_json`]);
//! [`CombatCatalog::default`] carries the preset roster from [`crate::presets`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::{Behavior, FactionRelation, Reaction};
use crate::error::{CatalogError, CatalogResult};
use crate::types::Millis;

/// Fire-control family of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WeaponKind {
    /// One projectile per charge.
    Instant,
    /// `shots` projectiles per charge, `sub_delay_ms` apart.
    Burst { shots: u32, sub_delay_ms: Millis },
    /// Prepare for `refresh_ms`, then tick `damage_per_tick` every
    /// `tick_interval_ms` for `duration_ms`, then cool down for `refresh_ms`.
    Beam {
        refresh_ms: Millis,
        duration_ms: Millis,
        tick_interval_ms: Millis,
        damage_per_tick: f32,
    },
}

/// Guidance parameters of a homing weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomingDef {
    pub turn_rate_deg: f32,
    pub retarget_interval_ms: Millis,
    pub lifetime_ms: Millis,
    /// Maximum launch offset from the aim heading (degrees).
    #[serde(default)]
    pub backfire_deg: f32,
    /// Maximum fixed per-projectile heading bias (degrees).
    #[serde(default)]
    pub bias_deg: f32,
    #[serde(default)]
    pub jitter_deg: f32,
    #[serde(default)]
    pub jitter_hz: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDef {
    pub kind: WeaponKind,
    /// Damage per projectile. Unused by beams.
    #[serde(default)]
    pub damage: f32,
    /// Charges per second.
    pub fire_rate: f32,
    pub range: f32,
    /// Unused by beams.
    #[serde(default)]
    pub projectile_speed: f32,
    pub accuracy: f32,
    #[serde(default = "default_max_error_deg")]
    pub max_error_deg: f32,
    #[serde(default)]
    pub homing: Option<HomingDef>,
}

fn default_max_error_deg() -> f32 {
    DEFAULT_MAX_AIM_ERROR_DEG
}

impl WeaponDef {
    /// Time between two charge starts.
    pub fn cooldown_ms(&self) -> Millis {
        (1000.0 / self.fire_rate).round() as Millis
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    pub hp_max: f32,
    pub hit_radius: f32,
    pub accuracy: f32,
    /// Weapon keys, one per mounted slot.
    pub weapons: Vec<String>,
}

/// What an AI profile does about each faction relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionTable {
    pub ally: Reaction,
    pub neutral: Reaction,
    pub cautious: Reaction,
    pub confrontation: Reaction,
}

impl ReactionTable {
    pub fn reaction_to(&self, relation: FactionRelation) -> Reaction {
        match relation {
            FactionRelation::Ally => self.ally,
            FactionRelation::Neutral => self.neutral,
            FactionRelation::Cautious => self.cautious,
            FactionRelation::Confrontation => self.confrontation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    pub behavior: Behavior,
    pub radar_range: f32,
    /// Flees from anything threatening and never attacks.
    #[serde(default)]
    pub non_combat: bool,
    #[serde(default)]
    pub reactions: ReactionTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    /// Hull fraction at or under which the NPC retreats.
    pub retreat_threshold: f32,
    /// Mean threat above which several threats count as overwhelming.
    pub high_threat_cutoff: f32,
}

/// Numeric tuning. Every field defaults to its constant in [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub spawn_settle_ms: Millis,
    pub undock_duration_ms: Millis,
    pub flee_calm_threshold: f32,
    pub flee_calm_dwell_ms: Millis,

    pub aggression_per_damage: f32,
    pub aggression_damage_quiet_ms: Millis,
    pub aggression_combat_quiet_ms: Millis,
    pub aggression_cooldown_rate: f32,
    pub aggression_source_window_ms: Millis,

    pub target_stability_period_ms: Millis,
    pub target_required_advantage: f32,
    pub score_damage_weight: f32,
    pub score_recency_max: f32,
    pub score_recency_window_ms: Millis,
    pub score_distance_weight: f32,
    pub score_current_target_bonus: f32,
    pub threat_recency_window_ms: Millis,
    pub threat_distance_scale: f32,

    pub retreat_low_hull_priority: f32,
    pub retreat_overwhelmed_priority: f32,
    pub flee_non_combat_priority: f32,
    pub flee_trader_priority: f32,
    pub attack_base_priority: f32,
    pub retaliate_base_priority: f32,
    pub retaliate_damage_factor: f32,
    pub patrol_priority: f32,
    pub overwhelmed_threat_count: usize,
    pub overwhelmed_aggression: f32,
    pub retaliation_window_ms: Millis,

    pub movement_command_ttl_ms: Millis,
    pub pursuit_refresh_ms: Millis,
    pub patrol_radius: f32,
    pub engagement_range_factor: f32,
    pub flee_distance: f32,

    pub stationary_speed: f32,
    pub intercept_max_iterations: u32,
    pub intercept_tolerance_secs: f32,
    pub homing_min_retarget_ms: Millis,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            spawn_settle_ms: SPAWN_SETTLE_MS,
            undock_duration_ms: UNDOCK_DURATION_MS,
            flee_calm_threshold: FLEE_CALM_THRESHOLD,
            flee_calm_dwell_ms: FLEE_CALM_DWELL_MS,
            aggression_per_damage: AGGRESSION_PER_DAMAGE,
            aggression_damage_quiet_ms: AGGRESSION_DAMAGE_QUIET_MS,
            aggression_combat_quiet_ms: AGGRESSION_COMBAT_QUIET_MS,
            aggression_cooldown_rate: AGGRESSION_COOLDOWN_RATE,
            aggression_source_window_ms: AGGRESSION_SOURCE_WINDOW_MS,
            target_stability_period_ms: TARGET_STABILITY_PERIOD_MS,
            target_required_advantage: TARGET_REQUIRED_ADVANTAGE,
            score_damage_weight: SCORE_DAMAGE_WEIGHT,
            score_recency_max: SCORE_RECENCY_MAX,
            score_recency_window_ms: SCORE_RECENCY_WINDOW_MS,
            score_distance_weight: SCORE_DISTANCE_WEIGHT,
            score_current_target_bonus: SCORE_CURRENT_TARGET_BONUS,
            threat_recency_window_ms: THREAT_RECENCY_WINDOW_MS,
            threat_distance_scale: THREAT_DISTANCE_SCALE,
            retreat_low_hull_priority: RETREAT_LOW_HULL_PRIORITY,
            retreat_overwhelmed_priority: RETREAT_OVERWHELMED_PRIORITY,
            flee_non_combat_priority: FLEE_NON_COMBAT_PRIORITY,
            flee_trader_priority: FLEE_TRADER_PRIORITY,
            attack_base_priority: ATTACK_BASE_PRIORITY,
            retaliate_base_priority: RETALIATE_BASE_PRIORITY,
            retaliate_damage_factor: RETALIATE_DAMAGE_FACTOR,
            patrol_priority: PATROL_PRIORITY,
            overwhelmed_threat_count: OVERWHELMED_THREAT_COUNT,
            overwhelmed_aggression: OVERWHELMED_AGGRESSION,
            retaliation_window_ms: RETALIATION_WINDOW_MS,
            movement_command_ttl_ms: MOVEMENT_COMMAND_TTL_MS,
            pursuit_refresh_ms: PURSUIT_REFRESH_MS,
            patrol_radius: PATROL_RADIUS,
            engagement_range_factor: ENGAGEMENT_RANGE_FACTOR,
            flee_distance: FLEE_DISTANCE,
            stationary_speed: STATIONARY_SPEED,
            intercept_max_iterations: INTERCEPT_MAX_ITERATIONS,
            intercept_tolerance_secs: INTERCEPT_TOLERANCE_SECS,
            homing_min_retarget_ms: HOMING_MIN_RETARGET_MS,
        }
    }
}

/// Everything the engine reads but never writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatCatalog {
    #[serde(default)]
    pub ships: BTreeMap<String, ShipStats>,
    #[serde(default)]
    pub weapons: BTreeMap<String, WeaponDef>,
    #[serde(default)]
    pub ai_profiles: BTreeMap<String, AiProfile>,
    #[serde(default)]
    pub combat_profiles: BTreeMap<String, CombatProfile>,
    #[serde(default)]
    pub tuning: Tuning,
}

impl Default for CombatCatalog {
    fn default() -> Self {
        crate::presets::standard_catalog()
    }
}

impl CombatCatalog {
    /// Catalog with no entries and default tuning.
    pub fn empty() -> Self {
        Self {
            ships: BTreeMap::new(),
            weapons: BTreeMap::new(),
            ai_profiles: BTreeMap::new(),
            combat_profiles: BTreeMap::new(),
            tuning: Tuning::default(),
        }
    }

    /// Parse and validate a catalog.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check cross references and value ranges.
    pub fn validate(&self) -> CatalogResult<()> {
        for (key, ship) in &self.ships {
            if ship.hp_max <= 0.0 {
                return Err(invalid(key, "hp_max must be positive"));
            }
            if !(0.0..=1.0).contains(&ship.accuracy) {
                return Err(invalid(key, "accuracy must be within [0, 1]"));
            }
            for weapon in &ship.weapons {
                if !self.weapons.contains_key(weapon) {
                    return Err(CatalogError::UnknownWeapon(weapon.clone()));
                }
            }
        }
        for (key, weapon) in &self.weapons {
            if weapon.fire_rate <= 0.0 {
                return Err(invalid(key, "fire_rate must be positive"));
            }
            if !(0.0..=1.0).contains(&weapon.accuracy) {
                return Err(invalid(key, "accuracy must be within [0, 1]"));
            }
            match weapon.kind {
                WeaponKind::Beam {
                    tick_interval_ms, ..
                } if tick_interval_ms == 0 => {
                    return Err(invalid(key, "beam tick_interval_ms must be positive"));
                }
                WeaponKind::Beam { .. } => {}
                _ if weapon.projectile_speed <= 0.0 => {
                    return Err(invalid(key, "projectile_speed must be positive"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn ship(&self, key: &str) -> CatalogResult<&ShipStats> {
        self.ships
            .get(key)
            .ok_or_else(|| CatalogError::UnknownShip(key.to_owned()))
    }

    pub fn weapon(&self, key: &str) -> CatalogResult<&WeaponDef> {
        self.weapons
            .get(key)
            .ok_or_else(|| CatalogError::UnknownWeapon(key.to_owned()))
    }

    pub fn ai_profile(&self, key: &str) -> CatalogResult<&AiProfile> {
        self.ai_profiles
            .get(key)
            .ok_or_else(|| CatalogError::UnknownAiProfile(key.to_owned()))
    }

    pub fn combat_profile(&self, key: &str) -> CatalogResult<&CombatProfile> {
        self.combat_profiles
            .get(key)
            .ok_or_else(|| CatalogError::UnknownCombatProfile(key.to_owned()))
    }

    /// Shortest range among a ship's weapons, if it carries any.
    pub fn shortest_weapon_range(&self, ship_key: &str) -> Option<f32> {
        let ship = self.ships.get(ship_key)?;
        ship.weapons
            .iter()
            .filter_map(|w| self.weapons.get(w))
            .map(|w| w.range)
            .reduce(f32::min)
    }
}

fn invalid(key: &str, reason: &str) -> CatalogError {
    CatalogError::Invalid {
        key: key.to_owned(),
        reason: reason.to_owned(),
    }
}
