//! Damage application: hull, damage log, aggression, and provocation.

use hecs::World;
use tracing::debug;

use starfray_ai::aggression;
use starfray_ai::targeting::{self, Candidate, ScoringContext};
use starfray_core::components::*;
use starfray_core::enums::NpcState;
use starfray_core::events::CombatEvent;

use super::npc;
use super::sensors::Picture;
use super::{read, PendingDamage, Services};
use crate::error::{EngineError, EngineResult};
use crate::registry::Registry;

pub fn run(
    world: &mut World,
    registry: &Registry,
    picture: &Picture,
    svc: &mut Services<'_>,
    pending: Vec<PendingDamage>,
) {
    for hit in pending {
        if let Err(err) = apply(world, registry, picture, svc, hit) {
            debug!(target_entity = %hit.target, %err, "damage dropped");
        }
    }
}

fn apply(
    world: &mut World,
    registry: &Registry,
    picture: &Picture,
    svc: &mut Services<'_>,
    hit: PendingDamage,
) -> EngineResult<()> {
    let catalog = svc.catalog;
    let tuning = &catalog.tuning;
    let now_ms = svc.now_ms;
    let entity = registry
        .entity(hit.target)
        .ok_or(EngineError::UnknownEntity(hit.target))?;
    let attacker = hit.attacker.filter(|a| registry.contains(*a));
    let amount = hit.amount.max(0.0);
    let state = read::<NpcStatus>(world, entity, hit.target)?.state;

    // Dead and docking-family hulls take nothing.
    if state == NpcState::Destroyed || state.is_docking_family() {
        return Ok(());
    }
    let hp_after = {
        let mut hull = world
            .get::<&mut Hull>(entity)
            .map_err(|_| EngineError::UnknownEntity(hit.target))?;
        if hull.hp <= 0.0 {
            return Ok(());
        }
        hull.hp = (hull.hp - amount).max(0.0);
        hull.hp
    };

    {
        let (aggr, log, stab, kin) = world
            .query_one_mut::<(
                &mut Aggression,
                &mut DamageLog,
                &mut TargetStabilization,
                &Kinematics,
            )>(entity)
            .map_err(|_| EngineError::UnknownEntity(hit.target))?;
        aggression::register_damage(aggr, amount, attacker, now_ms, tuning);

        if let Some(attacker) = attacker {
            log.first_attacker.get_or_insert(attacker);
            *log.total_by_source.entry(attacker).or_insert(0.0) += amount;
            log.last_time_by_source.insert(attacker, now_ms);

            // An unlocked victim turns on its attacker at once.
            if stab.current_target.is_none() && hp_after > 0.0 {
                if let Some(blip) = picture.targetable(attacker) {
                    let ctx = ScoringContext {
                        position: kin.position,
                        now_ms,
                        damage_log: log,
                        tuning,
                    };
                    let candidate = Candidate {
                        handle: attacker,
                        position: blip.position,
                    };
                    targeting::select_stable_target(&ctx, stab, &[candidate]);
                    npc::report_lock_change(hit.target, None, stab, svc.events);
                }
            }
        }
    }

    svc.events.push(CombatEvent::Damaged {
        target: hit.target,
        attacker,
        amount,
        hp_after,
    });

    if hp_after > 0.0 && aggression::provokes(state) {
        let plan = npc::plan_for(world, entity, catalog, |h| picture.get(h).map(|b| b.position));
        npc::change_state(
            world,
            entity,
            hit.target,
            NpcState::CombatSeeking,
            &plan,
            svc.locomotion,
            svc.events,
            now_ms,
        )?;
    }
    Ok(())
}
