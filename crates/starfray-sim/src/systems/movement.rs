//! Movement refresh system: expires stale commands and drops commands whose
//! tracked entity can no longer be followed.

use hecs::World;

use starfray_core::components::{Combatant, MovementQueue};

use super::sensors::Picture;
use super::Services;
use crate::movement;

pub fn run(world: &mut World, picture: &Picture, svc: &mut Services<'_>) {
    let ttl = svc.catalog.tuning.movement_command_ttl_ms;
    for (_entity, (combatant, queue)) in world.query_mut::<(&Combatant, &mut MovementQueue)>() {
        movement::update(
            queue,
            combatant.handle,
            svc.now_ms,
            ttl,
            |cmd| {
                cmd.target
                    .entity
                    .map_or(true, |h| picture.targetable(h).is_some())
            },
            svc.locomotion,
        );
    }
}
