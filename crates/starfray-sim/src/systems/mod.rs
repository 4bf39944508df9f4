//! Systems that operate on the combat world each tick.
//!
//! Systems are functions over `&mut World` plus the engine-owned services they
//! need. They do not own state; all state lives in components or in the
//! services the engine passes in.

pub mod aggression;
pub mod cleanup;
pub mod damage;
pub mod fire_control;
pub mod movement;
pub mod npc;
pub mod projectiles;
pub mod scheduled;
pub mod sensors;
pub mod snapshot;

use hecs::{Component, Entity, World};
use rand_chacha::ChaCha8Rng;
use starfray_core::catalog::CombatCatalog;
use starfray_core::events::CombatEvent;
use starfray_core::interfaces::{FactionOracle, Locomotion};
use starfray_core::types::{EntityHandle, Millis};

use crate::error::{EngineError, EngineResult};
use crate::scheduler::Scheduler;

/// Engine-owned services shared by the systems of one tick.
pub struct Services<'a> {
    pub catalog: &'a CombatCatalog,
    pub oracle: &'a dyn FactionOracle,
    pub locomotion: &'a mut dyn Locomotion,
    pub scheduler: &'a mut Scheduler,
    pub rng: &'a mut ChaCha8Rng,
    pub events: &'a mut Vec<CombatEvent>,
    pub now_ms: Millis,
    pub dt_ms: Millis,
}

/// Damage waiting to be applied in the damage phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingDamage {
    pub target: EntityHandle,
    pub attacker: Option<EntityHandle>,
    pub amount: f32,
}

/// A request to fire one projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotRequest {
    pub shooter: EntityHandle,
    pub slot: usize,
    pub target: EntityHandle,
}

/// Copy one component out of a combatant.
pub(crate) fn read<T: Component + Clone>(
    world: &World,
    entity: Entity,
    handle: EntityHandle,
) -> EngineResult<T> {
    world
        .get::<&T>(entity)
        .map(|c| (*c).clone())
        .map_err(|_| EngineError::UnknownEntity(handle))
}
