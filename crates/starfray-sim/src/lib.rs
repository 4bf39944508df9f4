//! Combat simulation for STARFRAY.
//!
//! Owns the hecs ECS world, runs the combat systems at a fixed tick and
//! produces a `CombatSnapshot` for the host each tick.

pub mod ballistics;
pub mod engine;
pub mod error;
pub mod locomotion;
pub mod movement;
pub mod registry;
pub mod scheduler;
pub mod systems;
pub mod world_setup;

pub use engine::{CombatEngine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use starfray_core as core;
pub use world_setup::CombatantSpawn;

#[cfg(test)]
mod tests;
