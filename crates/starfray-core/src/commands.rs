//! Host and player commands sent into the engine.
//!
//! Commands are queued and processed at the next tick boundary.

use serde::{Deserialize, Serialize};

use crate::enums::FactionRelation;
use crate::types::{EntityHandle, FactionId, Millis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerCommand {
    // --- Targeting ---
    /// Order an NPC to attack a target regardless of faction relations.
    AssignTarget {
        entity: EntityHandle,
        target: EntityHandle,
    },
    /// Drop a previous assignment.
    ClearAssignment { entity: EntityHandle },

    // --- Relations ---
    /// Override how `entity` regards `faction`, optionally for a limited time.
    SetRelationOverride {
        entity: EntityHandle,
        faction: FactionId,
        relation: FactionRelation,
        duration_ms: Option<Millis>,
    },
    ClearRelationOverride {
        entity: EntityHandle,
        faction: FactionId,
    },

    // --- Navigation ---
    OrderReturnHome { entity: EntityHandle },
    /// Start docking; only valid from `ReturningHome`.
    OrderDock { entity: EntityHandle },
    /// The host finished the docking maneuver.
    NotifyDocked { entity: EntityHandle },
    /// Clear all movement and hold position.
    EmergencyStop { entity: EntityHandle },

    // --- Simulation control ---
    Pause,
    Resume,
}
