//! Projectile flight, homing guidance, and swept collision.

use std::f32::consts::TAU;

use glam::Vec2;
use hecs::{Entity, World};

use starfray_ai::factions::is_confrontational;
use starfray_core::components::{Ballistic, Homing, Projectile};
use starfray_core::enums::{NpcState, ProjectileEnd, VisualKind};
use starfray_core::events::CombatEvent;
use starfray_core::interfaces::FactionOracle;

use super::sensors::{Blip, Picture};
use super::{PendingDamage, Services};
use crate::ballistics;

/// Move every projectile one step and resolve what it struck.
pub fn run(
    world: &mut World,
    picture: &Picture,
    svc: &mut Services<'_>,
    damage: &mut Vec<PendingDamage>,
) {
    let dt = svc.dt_ms as f32 / 1000.0;
    let mut flights: Vec<Entity> = world.query::<&Projectile>().iter().map(|(e, _)| e).collect();
    flights.sort_by_key(|e| e.to_bits());

    let mut ended = Vec::new();
    for entity in flights {
        let Ok((projectile, ballistic, homing)) =
            world.query_one_mut::<(&Projectile, &mut Ballistic, Option<&mut Homing>)>(entity)
        else {
            continue;
        };

        if let Some(homing) = homing {
            match projectile.target.and_then(|h| picture.targetable(h)) {
                Some(target) => {
                    let max_error_deg = svc
                        .catalog
                        .weapon(&projectile.weapon_key)
                        .map_or(0.0, |w| w.max_error_deg);
                    guide(ballistic, homing, target, max_error_deg, svc, dt);
                }
                None => {
                    ended.push((entity, ProjectileEnd::TargetLost, None));
                    continue;
                }
            }
        }

        ballistic.previous_position = ballistic.position;
        ballistic.position += ballistic.velocity * dt;

        if let Some((outcome, hit)) = collide(projectile, ballistic, picture, svc.oracle) {
            ended.push((entity, outcome, hit));
        }
    }

    for (entity, outcome, hit) in ended {
        damage.extend(hit);
        finish(world, svc, entity, outcome);
    }
}

/// Turn a homing projectile toward its (jittered) desired heading.
fn guide(
    ballistic: &mut Ballistic,
    homing: &mut Homing,
    target: &Blip,
    max_error_deg: f32,
    svc: &mut Services<'_>,
    dt: f32,
) {
    let tuning = &svc.catalog.tuning;
    let interval = homing.retarget_interval_ms.max(tuning.homing_min_retarget_ms);
    if svc.now_ms.saturating_sub(homing.last_retarget_ms) >= interval {
        let intercept = ballistics::solve_intercept(
            ballistic.position,
            target.position,
            target.velocity,
            ballistic.speed,
            tuning,
        );
        let error = ballistics::aim_error(svc.rng, homing.accuracy, max_error_deg);
        let aim = ballistics::perturb(ballistic.position, intercept.point, error);
        homing.desired_heading =
            ballistics::wrap_angle(ballistics::heading_to(ballistic.position, aim) + homing.bias);
        homing.last_retarget_ms = svc.now_ms;
    }

    let age_secs = svc.now_ms.saturating_sub(homing.launched_ms) as f32 / 1000.0;
    let jitter = homing.jitter_amplitude
        * (TAU * homing.jitter_hz * age_secs + homing.jitter_phase).sin();
    let max_turn = homing.turn_rate_deg.to_radians() * dt;
    ballistic.heading =
        ballistics::steer_heading(ballistic.heading, homing.desired_heading + jitter, max_turn);
    ballistic.velocity = Vec2::from_angle(ballistic.heading) * ballistic.speed;
}

/// May this projectile hurt `target`?
pub fn damage_permitted(
    oracle: &dyn FactionOracle,
    projectile: &Projectile,
    owner: Option<&Blip>,
    target: &Blip,
) -> bool {
    if projectile.player_assigned && projectile.target == Some(target.handle) {
        return true;
    }
    is_confrontational(
        oracle,
        &projectile.owner_faction,
        owner.map(|o| &o.overrides),
        &target.faction,
        Some(&target.overrides),
    )
}

/// First thing along this step's segment that stops the projectile.
///
/// Entities it may not damage are passed through; docking-family hulls
/// absorb it without taking damage. The shooter is never hit.
fn collide(
    projectile: &Projectile,
    ballistic: &Ballistic,
    picture: &Picture,
    oracle: &dyn FactionOracle,
) -> Option<(ProjectileEnd, Option<PendingDamage>)> {
    let from = ballistic.previous_position;
    let to = ballistic.position;
    let mut struck: Vec<(f32, &Blip)> = picture
        .iter()
        .filter(|b| Some(b.handle) != projectile.owner)
        .filter(|b| b.active && b.hp > 0.0 && b.state != NpcState::Destroyed)
        .filter(|b| ballistics::segment_hits_circle(from, to, b.position, b.hit_radius))
        .map(|b| (from.distance_squared(b.position), b))
        .collect();
    struck.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.handle.cmp(&b.1.handle)));

    let owner = projectile.owner.and_then(|h| picture.get(h));
    for (_, blip) in struck {
        if blip.state.is_docking_family() {
            return Some((ProjectileEnd::Absorbed, None));
        }
        if damage_permitted(oracle, projectile, owner, blip) {
            let hit = PendingDamage {
                target: blip.handle,
                attacker: projectile.owner,
                amount: projectile.damage,
            };
            return Some((ProjectileEnd::Hit, Some(hit)));
        }
    }
    None
}

/// Retire a projectile: cancel its lifetime timer, drop its visual, despawn.
pub fn finish(world: &mut World, svc: &mut Services<'_>, entity: Entity, outcome: ProjectileEnd) {
    let Ok((projectile, ballistic)) = world.query_one_mut::<(&mut Projectile, &Ballistic)>(entity)
    else {
        return;
    };
    if let Some(timer) = projectile.expiry_timer.take() {
        svc.scheduler.unregister(timer);
    }
    if let Some(visual) = projectile.visual.take() {
        svc.locomotion.destroy_visual(visual);
    }
    if outcome == ProjectileEnd::Hit {
        svc.locomotion
            .spawn_visual(VisualKind::Impact, ballistic.position, ballistic.heading);
    }
    svc.events.push(CombatEvent::ProjectileEnded {
        owner: projectile.owner,
        outcome,
        position: ballistic.position,
    });
    let _ = world.despawn(entity);
}
