//! Fundamental identity, time, and geometry types.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Simulation timestamp / duration in milliseconds.
pub type Millis = u64;

/// Stable identity of a combatant. Unique among live records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub u32);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a visual owned by the world collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// Identifier of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// Faction name as used by the relation oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(String);

impl FactionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FactionId {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a movement command points: a fixed position, optionally tracking an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveTarget {
    pub position: Vec2,
    pub entity: Option<EntityHandle>,
}

impl MoveTarget {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            entity: None,
        }
    }

    pub fn entity(entity: EntityHandle, position: Vec2) -> Self {
        Self {
            position,
            entity: Some(entity),
        }
    }
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTime {
    /// Number of unpaused ticks processed.
    pub tick: u64,
    /// Scheduler clock in milliseconds. Frozen while paused.
    pub now_ms: Millis,
}

impl SimTime {
    /// Elapsed simulation time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.now_ms as f64 / 1000.0
    }
}
