//! Fire control: weapon timing, projectile launch, and the beam cycle.
//!
//! Instant and burst weapons start a charge whenever their cooldown has
//! elapsed and the locked target is in range. Beams walk
//! `Idle -> Charging -> Active -> Refreshing -> Idle`, driven by scheduled
//! tasks; the beam visual lives exactly as long as the active phase.

use std::f32::consts::TAU;

use glam::Vec2;
use hecs::{Entity, World};
use rand::Rng;
use tracing::warn;

use starfray_ai::aggression;
use starfray_core::catalog::{CombatCatalog, WeaponDef, WeaponKind};
use starfray_core::components::*;
use starfray_core::enums::{BeamPhase, NpcState, VisualKind};
use starfray_core::events::CombatEvent;
use starfray_core::types::{EntityHandle, Millis, TimerId};

use super::sensors::{self, Blip, Picture};
use super::{PendingDamage, Services, ShotRequest};
use crate::ballistics;
use crate::scheduler::ScheduledTask;

/// Start charges and beam preparations for every attacking combatant, then
/// launch the resulting shots.
pub fn run(world: &mut World, picture: &Picture, svc: &mut Services<'_>) {
    let catalog = svc.catalog;
    let mut shots = Vec::new();

    for shooter in picture.iter() {
        if shooter.state != NpcState::CombatAttacking || !shooter.active || shooter.hp <= 0.0 {
            continue;
        }
        let Ok((stab, armament, aggr)) = world
            .query_one_mut::<(&TargetStabilization, &mut Armament, &mut Aggression)>(shooter.entity)
        else {
            continue;
        };
        let Some(target) = stab.current_target.and_then(|h| picture.targetable(h)) else {
            continue;
        };
        let distance = shooter.position.distance(target.position);

        for (index, slot) in armament.slots.iter_mut().enumerate() {
            let weapon = match catalog.weapon(&slot.weapon_key) {
                Ok(w) => w,
                Err(err) => {
                    warn!(entity = %shooter.handle, %err, "weapon slot skipped");
                    continue;
                }
            };
            if distance > weapon.range {
                continue;
            }

            match weapon.kind {
                WeaponKind::Beam { refresh_ms, .. } => {
                    if slot.beam != BeamPhase::Idle {
                        continue;
                    }
                    slot.beam = BeamPhase::Charging;
                    slot.beam_target = Some(target.handle);
                    let id = svc.scheduler.register(
                        refresh_ms,
                        ScheduledTask::BeamActivate {
                            shooter: shooter.handle,
                            slot: index,
                        },
                    );
                    slot.timers.push(id);
                }
                WeaponKind::Instant | WeaponKind::Burst { .. } => {
                    let ready = slot
                        .charge_started_ms
                        .map_or(true, |t| svc.now_ms.saturating_sub(t) >= weapon.cooldown_ms());
                    if !ready {
                        continue;
                    }
                    slot.charge_started_ms = Some(svc.now_ms);
                    shots.push(ShotRequest {
                        shooter: shooter.handle,
                        slot: index,
                        target: target.handle,
                    });
                    if let WeaponKind::Burst {
                        shots: count,
                        sub_delay_ms,
                    } = weapon.kind
                    {
                        for k in 1..count {
                            let id = svc.scheduler.register(
                                sub_delay_ms * Millis::from(k),
                                ScheduledTask::BurstShot {
                                    shooter: shooter.handle,
                                    slot: index,
                                    target: target.handle,
                                },
                            );
                            slot.timers.push(id);
                        }
                    }
                }
            }
            aggression::mark_combat(aggr, svc.now_ms);
        }
    }

    for shot in shots {
        launch(world, picture, svc, shot);
    }
}

/// Fire one projectile. Silently skipped when the shooter or target is gone.
pub fn launch(world: &mut World, picture: &Picture, svc: &mut Services<'_>, shot: ShotRequest) {
    let catalog = svc.catalog;
    let tuning = &catalog.tuning;
    let (Some(shooter), Some(target)) = (picture.get(shot.shooter), picture.targetable(shot.target))
    else {
        return;
    };
    if !world.contains(shooter.entity) {
        return;
    }
    let Some(weapon_key) = world
        .get::<&Armament>(shooter.entity)
        .ok()
        .and_then(|a| a.slots.get(shot.slot).map(|s| s.weapon_key.clone()))
    else {
        return;
    };
    let Ok(weapon) = catalog.weapon(&weapon_key) else {
        return;
    };
    let ship_accuracy = world
        .get::<&Hull>(shooter.entity)
        .map(|h| h.accuracy)
        .unwrap_or(1.0);
    let player_assigned = world
        .get::<&PlayerOrders>(shooter.entity)
        .is_ok_and(|o| o.assigned_target == Some(target.handle));

    let accuracy = (weapon.accuracy * ship_accuracy).clamp(0.0, 1.0);
    let intercept = ballistics::solve_intercept(
        shooter.position,
        target.position,
        target.velocity,
        weapon.projectile_speed,
        tuning,
    );
    let error = ballistics::aim_error(svc.rng, accuracy, weapon.max_error_deg);
    let aim_point = ballistics::perturb(shooter.position, intercept.point, error);
    let aim_heading = ballistics::heading_to(shooter.position, aim_point);

    let (heading, homing, lifetime_ms) = match &weapon.homing {
        Some(def) => {
            let backfire = if def.backfire_deg > 0.0 {
                svc.rng.gen_range(-def.backfire_deg..=def.backfire_deg).to_radians()
            } else {
                0.0
            };
            let bias = if def.bias_deg > 0.0 {
                svc.rng.gen_range(-def.bias_deg..=def.bias_deg).to_radians()
            } else {
                0.0
            };
            let homing = Homing {
                turn_rate_deg: def.turn_rate_deg,
                retarget_interval_ms: def.retarget_interval_ms.max(tuning.homing_min_retarget_ms),
                desired_heading: ballistics::wrap_angle(aim_heading + bias),
                last_retarget_ms: svc.now_ms,
                launched_ms: svc.now_ms,
                bias,
                jitter_amplitude: def.jitter_deg.to_radians(),
                jitter_hz: def.jitter_hz,
                jitter_phase: svc.rng.gen_range(0.0..TAU),
                accuracy,
            };
            (
                ballistics::wrap_angle(aim_heading + backfire),
                Some(homing),
                def.lifetime_ms,
            )
        }
        None => (aim_heading, None, flight_time_ms(weapon)),
    };

    let visual = svc
        .locomotion
        .spawn_visual(VisualKind::Projectile, shooter.position, heading);
    let projectile = Projectile {
        owner: Some(shooter.handle),
        owner_faction: shooter.faction.clone(),
        weapon_key: weapon_key.clone(),
        damage: weapon.damage,
        target: Some(target.handle),
        player_assigned,
        expiry_timer: None,
        visual: Some(visual),
    };
    let ballistic = Ballistic {
        position: shooter.position,
        previous_position: shooter.position,
        velocity: Vec2::from_angle(heading) * weapon.projectile_speed,
        speed: weapon.projectile_speed,
        heading,
    };
    let entity = match homing {
        Some(homing) => world.spawn((projectile, ballistic, homing)),
        None => world.spawn((projectile, ballistic)),
    };
    let timer = svc
        .scheduler
        .register(lifetime_ms, ScheduledTask::ProjectileExpiry { projectile: entity });
    if let Ok(mut p) = world.get::<&mut Projectile>(entity) {
        p.expiry_timer = Some(timer);
    }

    svc.events.push(CombatEvent::WeaponFired {
        shooter: shooter.handle,
        target: target.handle,
        weapon_key,
        aim_point,
    });
}

/// Time a non-homing projectile needs to cover the weapon's range.
fn flight_time_ms(weapon: &WeaponDef) -> Millis {
    if weapon.projectile_speed <= 0.0 {
        return 0;
    }
    ((weapon.range / weapon.projectile_speed) * 1000.0).ceil() as Millis
}

struct BeamSpec {
    refresh_ms: Millis,
    duration_ms: Millis,
    tick_interval_ms: Millis,
    damage_per_tick: f32,
    range: f32,
}

fn beam_spec(catalog: &CombatCatalog, weapon_key: &str) -> Option<BeamSpec> {
    let weapon = catalog.weapon(weapon_key).ok()?;
    match weapon.kind {
        WeaponKind::Beam {
            refresh_ms,
            duration_ms,
            tick_interval_ms,
            damage_per_tick,
        } => Some(BeamSpec {
            refresh_ms,
            duration_ms,
            tick_interval_ms,
            damage_per_tick,
            range: weapon.range,
        }),
        _ => None,
    }
}

/// The beam's target, if the connection still holds.
fn beam_holds<'p>(
    picture: &'p Picture,
    shooter: &Blip,
    target: Option<EntityHandle>,
    range: f32,
) -> Option<&'p Blip> {
    if shooter.state != NpcState::CombatAttacking || !shooter.active || shooter.hp <= 0.0 {
        return None;
    }
    picture
        .targetable(target?)
        .filter(|t| shooter.position.distance(t.position) <= range)
}

/// Stand a beam down: cancel its timers, drop the visual, and schedule the
/// return to idle after the refresh cooldown.
pub fn end_beam(
    slot: &mut WeaponSlot,
    shooter: EntityHandle,
    index: usize,
    refresh_ms: Millis,
    svc: &mut Services<'_>,
    at_ms: Millis,
    early: bool,
) {
    for id in slot.timers.drain(..) {
        svc.scheduler.unregister(id);
    }
    if let Some(visual) = slot.beam_visual.take() {
        svc.locomotion.destroy_visual(visual);
    }
    let was_active = slot.beam == BeamPhase::Active;
    slot.beam = BeamPhase::Refreshing;
    slot.beam_target = None;
    slot.beam_ticks_remaining = 0;
    let id = svc.scheduler.register_at(
        at_ms + refresh_ms,
        ScheduledTask::BeamReady {
            shooter,
            slot: index,
        },
    );
    slot.timers.push(id);
    if was_active {
        svc.events.push(CombatEvent::BeamEnded {
            shooter,
            weapon_key: slot.weapon_key.clone(),
            early,
        });
    }
}

fn slot_key(world: &World, entity: Entity, index: usize) -> Option<String> {
    world
        .get::<&Armament>(entity)
        .ok()
        .and_then(|a| a.slots.get(index).map(|s| s.weapon_key.clone()))
}

/// Preparation finished: connect, or cool down if the target slipped away.
pub fn activate_beam(
    world: &mut World,
    picture: &Picture,
    svc: &mut Services<'_>,
    shooter: &Blip,
    index: usize,
    timer: TimerId,
    due_ms: Millis,
) {
    let Some(spec) = slot_key(world, shooter.entity, index).and_then(|k| beam_spec(svc.catalog, &k))
    else {
        return;
    };
    let Ok(mut armament) = world.get::<&mut Armament>(shooter.entity) else {
        return;
    };
    let Some(slot) = armament.slots.get_mut(index) else {
        return;
    };
    slot.timers.retain(|id| *id != timer);
    if slot.beam != BeamPhase::Charging {
        return;
    }

    match beam_holds(picture, shooter, slot.beam_target, spec.range) {
        Some(target) => {
            slot.beam = BeamPhase::Active;
            slot.beam_ticks_remaining = (spec.duration_ms / spec.tick_interval_ms.max(1)) as u32;
            let heading = ballistics::heading_to(shooter.position, target.position);
            slot.beam_visual = Some(
                svc.locomotion
                    .spawn_visual(VisualKind::Beam, shooter.position, heading),
            );
            let id = svc.scheduler.register_at(
                due_ms + spec.tick_interval_ms,
                ScheduledTask::BeamTick {
                    shooter: shooter.handle,
                    slot: index,
                },
            );
            slot.timers.push(id);
            svc.events.push(CombatEvent::BeamActivated {
                shooter: shooter.handle,
                target: target.handle,
                weapon_key: slot.weapon_key.clone(),
            });
        }
        None => end_beam(slot, shooter.handle, index, spec.refresh_ms, svc, due_ms, true),
    }
}

/// One damage tick of an active beam.
#[allow(clippy::too_many_arguments)]
pub fn beam_tick(
    world: &mut World,
    picture: &Picture,
    svc: &mut Services<'_>,
    shooter: &Blip,
    index: usize,
    timer: TimerId,
    due_ms: Millis,
    damage: &mut Vec<PendingDamage>,
) {
    let Some(spec) = slot_key(world, shooter.entity, index).and_then(|k| beam_spec(svc.catalog, &k))
    else {
        return;
    };
    let assigned = world
        .get::<&PlayerOrders>(shooter.entity)
        .ok()
        .and_then(|o| o.assigned_target);
    let Ok(mut armament) = world.get::<&mut Armament>(shooter.entity) else {
        return;
    };
    let Some(slot) = armament.slots.get_mut(index) else {
        return;
    };
    slot.timers.retain(|id| *id != timer);
    if slot.beam != BeamPhase::Active {
        return;
    }

    let Some(target) = beam_holds(picture, shooter, slot.beam_target, spec.range) else {
        end_beam(slot, shooter.handle, index, spec.refresh_ms, svc, due_ms, true);
        return;
    };

    if assigned == Some(target.handle) || sensors::is_hostile(svc.oracle, shooter, target) {
        damage.push(PendingDamage {
            target: target.handle,
            attacker: Some(shooter.handle),
            amount: spec.damage_per_tick,
        });
    }
    slot.beam_ticks_remaining = slot.beam_ticks_remaining.saturating_sub(1);
    if slot.beam_ticks_remaining == 0 {
        end_beam(slot, shooter.handle, index, spec.refresh_ms, svc, due_ms, false);
    } else {
        let id = svc.scheduler.register_at(
            due_ms + spec.tick_interval_ms,
            ScheduledTask::BeamTick {
                shooter: shooter.handle,
                slot: index,
            },
        );
        slot.timers.push(id);
    }
}

/// Refresh cooldown over.
pub fn beam_ready(world: &mut World, entity: Entity, index: usize, timer: TimerId) {
    if let Ok(mut armament) = world.get::<&mut Armament>(entity) {
        if let Some(slot) = armament.slots.get_mut(index) {
            slot.timers.retain(|id| *id != timer);
            if slot.beam == BeamPhase::Refreshing {
                slot.beam = BeamPhase::Idle;
            }
        }
    }
}

/// Forget a burst sub-shot timer once it has fired.
pub fn forget_timer(world: &mut World, entity: Entity, index: usize, timer: TimerId) {
    if let Ok(mut armament) = world.get::<&mut Armament>(entity) {
        if let Some(slot) = armament.slots.get_mut(index) {
            slot.timers.retain(|id| *id != timer);
        }
    }
}

/// Stand down every beam of `armament` connected to `target`.
pub fn disconnect_beams(
    armament: &mut Armament,
    shooter: EntityHandle,
    target: EntityHandle,
    svc: &mut Services<'_>,
) {
    let catalog = svc.catalog;
    let now_ms = svc.now_ms;
    for (index, slot) in armament.slots.iter_mut().enumerate() {
        if slot.beam_target != Some(target) {
            continue;
        }
        let refresh_ms = beam_spec(catalog, &slot.weapon_key).map_or(0, |s| s.refresh_ms);
        end_beam(slot, shooter, index, refresh_ms, svc, now_ms, true);
    }
}

