//! Snapshot system: queries the world and builds a complete CombatSnapshot.
//!
//! This system is read-only; it never modifies the world.

use hecs::World;

use starfray_core::components::*;
use starfray_core::events::CombatEvent;
use starfray_core::state::{CombatSnapshot, CombatantView, ProjectileView};
use starfray_core::types::SimTime;

/// Build the tick report.
pub fn build_snapshot(
    world: &World,
    time: SimTime,
    paused: bool,
    events: Vec<CombatEvent>,
) -> CombatSnapshot {
    CombatSnapshot {
        time,
        paused,
        combatants: build_combatants(world),
        projectiles: build_projectiles(world),
        events,
    }
}

/// One view per combatant, ordered by handle.
fn build_combatants(world: &World) -> Vec<CombatantView> {
    let mut views: Vec<CombatantView> = world
        .query::<(
            &Combatant,
            &Hull,
            &Kinematics,
            &NpcStatus,
            &Aggression,
            &TargetStabilization,
            &Intent,
            &MovementQueue,
        )>()
        .iter()
        .map(
            |(_, (combatant, hull, kin, status, aggr, stab, intent, queue))| CombatantView {
                handle: combatant.handle,
                faction: combatant.faction.clone(),
                state: status.state,
                hp: hull.hp,
                hp_max: hull.hp_max,
                position: kin.position,
                aggression: aggr.level,
                current_target: stab.current_target,
                intent: intent.current,
                movement: queue.current,
            },
        )
        .collect();
    views.sort_by_key(|v| v.handle);
    views
}

/// Projectiles in spawn order.
fn build_projectiles(world: &World) -> Vec<ProjectileView> {
    let mut flights: Vec<(u64, ProjectileView)> = world
        .query::<(&Projectile, &Ballistic, Option<&Homing>)>()
        .iter()
        .map(|(entity, (projectile, ballistic, homing))| {
            (
                entity.to_bits().get(),
                ProjectileView {
                    owner: projectile.owner,
                    target: projectile.target,
                    weapon_key: projectile.weapon_key.clone(),
                    position: ballistic.position,
                    heading: ballistic.heading,
                    homing: homing.is_some(),
                },
            )
        })
        .collect();
    flights.sort_by_key(|f| f.0);
    flights.into_iter().map(|(_, view)| view).collect()
}
