//! Cleanup system: destroys dead hulls, despawns docked ones, and scrubs every
//! reference to a departing handle in the same tick.

use hecs::{Entity, World};
use tracing::info;

use starfray_ai::{aggression, targeting};
use starfray_core::components::*;
use starfray_core::enums::{NpcState, ProjectileEnd};
use starfray_core::events::CombatEvent;
use starfray_core::types::EntityHandle;

use super::npc::{self, StatePlan};
use super::{fire_control, projectiles, Services};
use crate::movement;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Destroyed,
    Docked,
}

pub fn run(world: &mut World, registry: &mut Registry, svc: &mut Services<'_>) {
    let mut doomed: Vec<(EntityHandle, Entity, Fate)> = world
        .query::<(&Combatant, &Hull, &NpcStatus)>()
        .iter()
        .filter_map(|(entity, (combatant, hull, status))| {
            if hull.hp <= 0.0 || status.state == NpcState::Destroyed {
                Some((combatant.handle, entity, Fate::Destroyed))
            } else if status.state == NpcState::Docked {
                Some((combatant.handle, entity, Fate::Docked))
            } else {
                None
            }
        })
        .collect();
    doomed.sort_by_key(|d| d.0);

    for (handle, entity, fate) in doomed {
        match fate {
            Fate::Destroyed => {
                let by = last_attacker(world, entity);
                let position = world
                    .get::<&Kinematics>(entity)
                    .map(|k| k.position)
                    .unwrap_or_default();
                let plan = StatePlan {
                    position,
                    ..StatePlan::default()
                };
                // Fails only when the state already reads Destroyed.
                let _ = npc::change_state(
                    world,
                    entity,
                    handle,
                    NpcState::Destroyed,
                    &plan,
                    svc.locomotion,
                    svc.events,
                    svc.now_ms,
                );
                info!(entity = %handle, ?by, "combatant destroyed");
                svc.events.push(CombatEvent::Destroyed { entity: handle, by });
            }
            Fate::Docked => {
                info!(entity = %handle, "combatant docked and despawned");
                svc.events.push(CombatEvent::Despawned { entity: handle });
            }
        }
        purge(world, registry, svc, handle);
    }
}

/// Whoever hurt `entity` most recently.
fn last_attacker(world: &World, entity: Entity) -> Option<EntityHandle> {
    let log = world.get::<&DamageLog>(entity).ok()?;
    log.last_time_by_source
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(&h, _)| h)
}

/// Remove `handle` from the world and from every record that references it.
pub fn purge(world: &mut World, registry: &mut Registry, svc: &mut Services<'_>, handle: EntityHandle) {
    svc.scheduler.cancel_where(|task| task.references(handle));

    if let Some(entity) = registry.entity(handle) {
        if let Ok(armament) = world.get::<&Armament>(entity) {
            for slot in &armament.slots {
                if let Some(visual) = slot.beam_visual {
                    svc.locomotion.destroy_visual(visual);
                }
            }
        }
    }

    for (_entity, (combatant, aggr, stab, intent, log, queue, orders, armament)) in world
        .query_mut::<(
            &Combatant,
            &mut Aggression,
            &mut TargetStabilization,
            &mut Intent,
            &mut DamageLog,
            &mut MovementQueue,
            &mut PlayerOrders,
            &mut Armament,
        )>()
    {
        if combatant.handle == handle {
            continue;
        }
        aggression::forget_source(aggr, handle);
        if stab.current_target == Some(handle) {
            targeting::release_target(stab);
        }
        if intent.current.is_some_and(|i| i.target == handle) {
            intent.current = None;
        }
        log.total_by_source.remove(&handle);
        log.last_time_by_source.remove(&handle);
        if log.first_attacker == Some(handle) {
            log.first_attacker = None;
        }
        movement::purge_target(queue, combatant.handle, handle, svc.locomotion);
        if orders.assigned_target == Some(handle) {
            orders.assigned_target = None;
        }
        for slot in &mut armament.slots {
            slot.timers.retain(|id| svc.scheduler.is_registered(*id));
        }
        fire_control::disconnect_beams(armament, combatant.handle, handle, svc);
    }

    let mut lost = Vec::new();
    for (entity, (projectile, homing)) in world.query_mut::<(&mut Projectile, Option<&Homing>)>() {
        if projectile.owner == Some(handle) {
            projectile.owner = None;
        }
        if projectile.target == Some(handle) {
            if homing.is_some() {
                lost.push(entity);
            } else {
                projectile.target = None;
            }
        }
    }
    lost.sort_by_key(|e| e.to_bits());
    for entity in lost {
        projectiles::finish(world, svc, entity, ProjectileEnd::TargetLost);
    }

    if let Some(entity) = registry.remove(handle) {
        let _ = world.despawn(entity);
    }
}
