//! Events emitted by the engine for hosts, UI, and tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{EntityHandle, Millis};

/// Outcome notifications collected during one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CombatEvent {
    /// NPC changed state.
    StateChanged {
        entity: EntityHandle,
        from: NpcState,
        to: NpcState,
        at_ms: Millis,
    },
    /// A forbidden transition was requested and ignored.
    TransitionRejected {
        entity: EntityHandle,
        from: NpcState,
        to: NpcState,
    },
    /// Target adopted with no previous lock.
    TargetAcquired {
        entity: EntityHandle,
        target: EntityHandle,
        score: f32,
    },
    /// Lock moved from one target to another.
    TargetSwitched {
        entity: EntityHandle,
        from: EntityHandle,
        to: EntityHandle,
        score: f32,
    },
    /// Decision synthesis picked an action.
    DecisionMade {
        entity: EntityHandle,
        action: DecisionAction,
        target: Option<EntityHandle>,
        priority: f32,
        reason: DecisionReason,
    },
    /// A projectile left a weapon.
    WeaponFired {
        shooter: EntityHandle,
        target: EntityHandle,
        weapon_key: String,
        aim_point: Vec2,
    },
    BeamActivated {
        shooter: EntityHandle,
        target: EntityHandle,
        weapon_key: String,
    },
    BeamEnded {
        shooter: EntityHandle,
        weapon_key: String,
        /// True when the beam disconnected before its full duration.
        early: bool,
    },
    ProjectileEnded {
        owner: Option<EntityHandle>,
        outcome: ProjectileEnd,
        position: Vec2,
    },
    Damaged {
        target: EntityHandle,
        attacker: Option<EntityHandle>,
        amount: f32,
        hp_after: f32,
    },
    Destroyed {
        entity: EntityHandle,
        by: Option<EntityHandle>,
    },
    /// Entity left the simulation without being destroyed (e.g. docked).
    Despawned { entity: EntityHandle },
    /// A registration collided with a live handle and was given a fresh one.
    HandleReassigned {
        requested: EntityHandle,
        assigned: EntityHandle,
    },
    /// A movement command lost arbitration against the current one.
    MovementRejected {
        entity: EntityHandle,
        source: CommandSource,
        priority: MovementPriority,
    },
}
