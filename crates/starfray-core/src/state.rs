//! Tick report: the complete visible combat state after each tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::{CombatIntent, MovementCommand};
use crate::enums::NpcState;
use crate::events::CombatEvent;
use crate::types::{EntityHandle, FactionId, SimTime};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatSnapshot {
    pub time: SimTime,
    pub paused: bool,
    /// Sorted by handle.
    pub combatants: Vec<CombatantView>,
    pub projectiles: Vec<ProjectileView>,
    pub events: Vec<CombatEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantView {
    pub handle: EntityHandle,
    pub faction: FactionId,
    pub state: NpcState,
    pub hp: f32,
    pub hp_max: f32,
    pub position: Vec2,
    pub aggression: f32,
    pub current_target: Option<EntityHandle>,
    pub intent: Option<CombatIntent>,
    pub movement: Option<MovementCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileView {
    pub owner: Option<EntityHandle>,
    pub target: Option<EntityHandle>,
    pub weapon_key: String,
    pub position: Vec2,
    pub heading: f32,
    pub homing: bool,
}

impl CombatSnapshot {
    pub fn combatant(&self, handle: EntityHandle) -> Option<&CombatantView> {
        self.combatants.iter().find(|c| c.handle == handle)
    }
}
