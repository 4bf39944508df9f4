//! Runs every scheduler task that has come due, oldest first.

use hecs::World;
use tracing::trace;

use starfray_core::enums::ProjectileEnd;

use super::sensors::Picture;
use super::{fire_control, projectiles, PendingDamage, Services, ShotRequest};
use crate::scheduler::ScheduledTask;

pub fn run(
    world: &mut World,
    picture: &Picture,
    svc: &mut Services<'_>,
    damage: &mut Vec<PendingDamage>,
) {
    while let Some((timer, due_ms, task)) = svc.scheduler.pop_due() {
        trace!(?task, due_ms, "scheduled task");
        match task {
            ScheduledTask::BurstShot {
                shooter,
                slot,
                target,
            } => {
                if let Some(blip) = picture.get(shooter) {
                    fire_control::forget_timer(world, blip.entity, slot, timer);
                    fire_control::launch(
                        world,
                        picture,
                        svc,
                        ShotRequest {
                            shooter,
                            slot,
                            target,
                        },
                    );
                }
            }
            ScheduledTask::BeamActivate { shooter, slot } => {
                if let Some(blip) = picture.get(shooter) {
                    fire_control::activate_beam(world, picture, svc, blip, slot, timer, due_ms);
                }
            }
            ScheduledTask::BeamTick { shooter, slot } => {
                if let Some(blip) = picture.get(shooter) {
                    fire_control::beam_tick(world, picture, svc, blip, slot, timer, due_ms, damage);
                }
            }
            ScheduledTask::BeamReady { shooter, slot } => {
                if let Some(blip) = picture.get(shooter) {
                    fire_control::beam_ready(world, blip.entity, slot, timer);
                }
            }
            ScheduledTask::ProjectileExpiry { projectile } => {
                projectiles::finish(world, svc, projectile, ProjectileEnd::Expired);
            }
        }
    }
}
