//! ECS components for hecs entities.
//!
//! Components are plain data structs with no behavior.
//! Game logic lives in the AI crate and in simulation systems.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::*;
use crate::types::{EntityHandle, FactionId, Millis, MoveTarget, TimerId, VisualHandle};

/// Identity and static configuration keys of a combatant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub handle: EntityHandle,
    pub faction: FactionId,
    pub ship_key: String,
    pub ai_profile_key: String,
    pub combat_profile_key: String,
    /// Anchor for patrols, returning home, and docking.
    pub home: Vec2,
    /// Destination of a trade run, if any.
    pub trade_destination: Option<Vec2>,
}

/// Hull integrity and hit geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Hull {
    pub hp: f32,
    pub hp_max: f32,
    pub hit_radius: f32,
    /// Ship-side aim quality in [0, 1].
    pub accuracy: f32,
}

/// Position and activity mirrored from the world collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
    /// False while the world has the entity disabled (hidden, warping, ...).
    pub active: bool,
}

/// State machine bookkeeping.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NpcStatus {
    pub state: NpcState,
    pub previous_state: NpcState,
    pub state_enter_ms: Millis,
    /// Since when aggression has stayed under the flee calm threshold.
    pub calm_since_ms: Option<Millis>,
}

/// Accumulated damage from one attacker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageSource {
    pub damage: f32,
    pub last_ms: Millis,
}

/// Hostility scalar driven by damage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggression {
    /// Always within [0, 1].
    pub level: f32,
    pub last_damage_ms: Option<Millis>,
    pub last_combat_ms: Option<Millis>,
    /// Decay per second.
    pub cooldown_rate: f32,
    pub sources: HashMap<EntityHandle, DamageSource>,
}

impl Default for Aggression {
    fn default() -> Self {
        Self {
            level: 0.0,
            last_damage_ms: None,
            last_combat_ms: None,
            cooldown_rate: AGGRESSION_COOLDOWN_RATE,
            sources: HashMap::new(),
        }
    }
}

/// Hysteresis state of target selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetStabilization {
    pub current_target: Option<EntityHandle>,
    pub target_score: f32,
    pub target_switch_ms: Millis,
    pub required_advantage: f32,
    pub stability_period_ms: Millis,
}

impl Default for TargetStabilization {
    fn default() -> Self {
        Self {
            current_target: None,
            target_score: 0.0,
            target_switch_ms: 0,
            required_advantage: TARGET_REQUIRED_ADVANTAGE,
            stability_period_ms: TARGET_STABILITY_PERIOD_MS,
        }
    }
}

/// One movement intent competing for the locomotion collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementCommand {
    pub mode: MovementMode,
    pub target: MoveTarget,
    pub distance: Option<f32>,
    pub priority: MovementPriority,
    pub source: CommandSource,
    pub timestamp_ms: Millis,
}

/// Priority-arbitrated movement intents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementQueue {
    /// Sorted by descending priority, oldest first within a priority.
    pub queued: Vec<MovementCommand>,
    pub current: Option<MovementCommand>,
    /// Set by an emergency stop; the state's own intent is not re-posted
    /// until the next state change.
    #[serde(default)]
    pub halted: bool,
}

/// A declared intent toward another combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatIntent {
    pub kind: IntentKind,
    pub target: EntityHandle,
}

/// Intent slot of a combatant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Intent {
    pub current: Option<CombatIntent>,
}

/// Who has hurt this combatant, and how much.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageLog {
    pub first_attacker: Option<EntityHandle>,
    pub total_by_source: HashMap<EntityHandle, f32>,
    pub last_time_by_source: HashMap<EntityHandle, Millis>,
}

/// A temporary, per-entity adjustment of a faction relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationOverride {
    pub relation: FactionRelation,
    /// None = until cleared.
    pub expires_ms: Option<Millis>,
}

/// Per-entity relation overrides, keyed by the other faction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationOverrides {
    pub by_faction: HashMap<FactionId, RelationOverride>,
}

/// Orders given by the player.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlayerOrders {
    pub assigned_target: Option<EntityHandle>,
}

/// Fire-control state of one mounted weapon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponSlot {
    pub weapon_key: String,
    /// Start of the running charge (instant/burst weapons).
    pub charge_started_ms: Option<Millis>,
    pub beam: BeamPhase,
    pub beam_target: Option<EntityHandle>,
    pub beam_ticks_remaining: u32,
    pub beam_visual: Option<VisualHandle>,
    /// Pending scheduler entries owned by this slot.
    pub timers: Vec<TimerId>,
}

/// Mounted weapons.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Armament {
    pub slots: Vec<WeaponSlot>,
}

/// A projectile in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    /// Cleared when the shooter is destroyed.
    pub owner: Option<EntityHandle>,
    pub owner_faction: FactionId,
    pub weapon_key: String,
    pub damage: f32,
    pub target: Option<EntityHandle>,
    /// Fired at a player-assigned target: bypasses the faction filter for it.
    pub player_assigned: bool,
    pub expiry_timer: Option<TimerId>,
    pub visual: Option<VisualHandle>,
}

/// Flight state of a projectile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Ballistic {
    pub position: Vec2,
    pub previous_position: Vec2,
    pub velocity: Vec2,
    pub speed: f32,
    /// Radians, measured from +x toward +y.
    pub heading: f32,
}

/// Guidance state of a homing projectile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Homing {
    pub turn_rate_deg: f32,
    pub retarget_interval_ms: Millis,
    pub desired_heading: f32,
    pub last_retarget_ms: Millis,
    pub launched_ms: Millis,
    /// Fixed per-projectile offset (radians).
    pub bias: f32,
    pub jitter_amplitude: f32,
    pub jitter_hz: f32,
    pub jitter_phase: f32,
    pub accuracy: f32,
}
