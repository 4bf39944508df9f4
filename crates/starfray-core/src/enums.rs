//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// NPC behavior state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcState {
    /// Freshly registered, settling before its first behavior.
    #[default]
    Spawning,
    Idle,
    Patrolling,
    Trading,
    /// Looking for something to fight (or a reason not to).
    CombatSeeking,
    CombatAttacking,
    CombatFleeing,
    Docking,
    Docked,
    Undocking,
    ReturningHome,
    /// Terminal.
    Destroyed,
}

impl NpcState {
    /// Peaceful states that damage snaps into `CombatSeeking`.
    pub fn is_passive(self) -> bool {
        matches!(self, Self::Idle | Self::Patrolling | Self::Trading)
    }

    /// States in which the entity cannot be targeted or damaged.
    pub fn is_docking_family(self) -> bool {
        matches!(self, Self::Docking | Self::Docked | Self::Undocking)
    }
}

/// How the locomotion collaborator should move toward a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    MoveTo,
    Pursue,
    Orbit,
    Flee,
}

/// Arbitration priority of a movement command. Ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum MovementPriority {
    Idle = 10,
    Trade = 20,
    Patrol = 40,
    Scenario = 50,
    PlayerCommand = 60,
    Combat = 80,
    EmergencyFlee = 100,
}

impl MovementPriority {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Who posted a movement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandSource {
    Idle,
    Patrol,
    Trade,
    Scenario,
    Docking,
    Player,
    Combat,
    Flee,
}

/// Relation of one faction toward another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactionRelation {
    Ally,
    #[default]
    Neutral,
    Confrontation,
    Cautious,
}

/// Standing disposition of an AI profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    /// Attacks any hostile it sees.
    Aggressive,
    /// Fights back only when provoked or told to by its reaction table.
    Defensive,
    /// Patrols a home area; otherwise defensive.
    #[default]
    Patrol,
    /// Runs trade routes; avoids confrontation-rated factions.
    Trader,
    /// Sits still.
    Idle,
}

/// What an AI profile does about a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    Attack,
    #[default]
    Ignore,
    Avoid,
}

/// Declared intent of a combatant, visible to everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    Attack,
    Flee,
    Retreat,
}

/// Action chosen by the combat decision synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionAction {
    Attack,
    Flee,
    Retreat,
    Patrol,
}

/// Why a decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionReason {
    /// Hull at or under the retreat threshold.
    LowHull,
    /// Several strong threats while already highly agitated.
    Overwhelmed,
    /// Non-combat hull with any threat around.
    NonCombatant,
    /// Trader sighting a confrontation-rated faction.
    HostileFaction,
    AggressiveDisposition,
    FactionReaction,
    Retaliation,
    /// Target assigned by the player.
    PlayerOrder,
    NoThreat,
}

/// Beam weapon slot phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamPhase {
    #[default]
    Idle,
    /// Preparing; no damage yet.
    Charging,
    /// Connected and ticking damage.
    Active,
    /// Cooling down before the next prepare.
    Refreshing,
}

/// Kind of visual requested from the world collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualKind {
    Projectile,
    Beam,
    Impact,
}

/// How a projectile left the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileEnd {
    Hit,
    /// Absorbed by an invulnerable (docking) hull.
    Absorbed,
    TargetLost,
    Expired,
}
