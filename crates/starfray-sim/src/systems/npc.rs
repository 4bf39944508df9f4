//! NPC system: threat assessment, combat decision, and state machine update.
//!
//! Also owns the enter/exit hooks that post and withdraw movement intents.
//! Every state change (AI-driven, provoked by damage, ordered by the host, or
//! caused by destruction) goes through [`change_state`].

use glam::Vec2;
use hecs::{Entity, World};
use tracing::{debug, warn};

use starfray_ai::decision::{self, Contact, DecisionInput};
use starfray_ai::fsm::{self, NpcContext, StateHooks};
use starfray_ai::targeting;
use starfray_core::catalog::CombatCatalog;
use starfray_core::components::*;
use starfray_core::enums::*;
use starfray_core::events::CombatEvent;
use starfray_core::interfaces::Locomotion;
use starfray_core::types::{EntityHandle, Millis, MoveTarget};

use super::sensors::{self, Blip, Picture};
use super::{read, Services};
use crate::error::{EngineError, EngineResult};
use crate::movement::{self, AddOutcome};

/// Where a state's movement intent should point.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatePlan {
    pub position: Vec2,
    pub home: Vec2,
    pub trade_destination: Option<Vec2>,
    pub pursue: Option<(EntityHandle, Vec2)>,
    pub flee_from: Option<(EntityHandle, Vec2)>,
    /// Stand-off distance while pursuing; None for unarmed hulls.
    pub engage_distance: Option<f32>,
    pub patrol_radius: f32,
    pub flee_distance: f32,
}

/// Gather what the state hooks of `entity` need.
///
/// `locate` resolves other combatants' positions.
pub fn plan_for(
    world: &World,
    entity: Entity,
    catalog: &CombatCatalog,
    locate: impl Fn(EntityHandle) -> Option<Vec2>,
) -> StatePlan {
    let tuning = &catalog.tuning;
    let mut plan = StatePlan {
        patrol_radius: tuning.patrol_radius,
        flee_distance: tuning.flee_distance,
        ..StatePlan::default()
    };
    let with_position = |h: EntityHandle| locate(h).map(|p| (h, p));

    if let Ok(combatant) = world.get::<&Combatant>(entity) {
        plan.home = combatant.home;
        plan.trade_destination = combatant.trade_destination;
        plan.engage_distance = catalog
            .shortest_weapon_range(&combatant.ship_key)
            .map(|r| r * tuning.engagement_range_factor);
    }
    if let Ok(kin) = world.get::<&Kinematics>(entity) {
        plan.position = kin.position;
    }
    if let Ok(stab) = world.get::<&TargetStabilization>(entity) {
        plan.pursue = stab.current_target.and_then(&with_position);
    }
    if let Ok(intent) = world.get::<&Intent>(entity) {
        plan.flee_from = intent
            .current
            .filter(|i| matches!(i.kind, IntentKind::Flee | IntentKind::Retreat))
            .and_then(|i| with_position(i.target));
    }
    plan
}

/// Source tag of the movement intent a state posts.
pub fn source_for_state(state: NpcState) -> Option<CommandSource> {
    match state {
        NpcState::Idle => Some(CommandSource::Idle),
        NpcState::Patrolling => Some(CommandSource::Patrol),
        NpcState::Trading => Some(CommandSource::Trade),
        NpcState::CombatAttacking => Some(CommandSource::Combat),
        NpcState::CombatFleeing => Some(CommandSource::Flee),
        NpcState::ReturningHome | NpcState::Docking => Some(CommandSource::Docking),
        _ => None,
    }
}

/// The movement intent a state wants, if any.
pub fn command_for_state(state: NpcState, plan: &StatePlan, now_ms: Millis) -> Option<MovementCommand> {
    let command = |mode, target, distance, priority, source| MovementCommand {
        mode,
        target,
        distance,
        priority,
        source,
        timestamp_ms: now_ms,
    };

    match state {
        NpcState::Idle => Some(command(
            MovementMode::MoveTo,
            MoveTarget::at(plan.position),
            Some(0.0),
            MovementPriority::Idle,
            CommandSource::Idle,
        )),
        NpcState::Patrolling => Some(command(
            MovementMode::Orbit,
            MoveTarget::at(plan.home),
            Some(plan.patrol_radius),
            MovementPriority::Patrol,
            CommandSource::Patrol,
        )),
        NpcState::Trading => plan.trade_destination.map(|dest| {
            command(
                MovementMode::MoveTo,
                MoveTarget::at(dest),
                None,
                MovementPriority::Trade,
                CommandSource::Trade,
            )
        }),
        NpcState::CombatAttacking => plan.pursue.map(|(target, position)| {
            command(
                MovementMode::Pursue,
                MoveTarget::entity(target, position),
                plan.engage_distance,
                MovementPriority::Combat,
                CommandSource::Combat,
            )
        }),
        NpcState::CombatFleeing => Some(match plan.flee_from {
            Some((threat, position)) => command(
                MovementMode::Flee,
                MoveTarget::entity(threat, position),
                Some(plan.flee_distance),
                MovementPriority::EmergencyFlee,
                CommandSource::Flee,
            ),
            // Nothing specific to run from: run home.
            None => command(
                MovementMode::MoveTo,
                MoveTarget::at(plan.home),
                None,
                MovementPriority::EmergencyFlee,
                CommandSource::Flee,
            ),
        }),
        NpcState::ReturningHome | NpcState::Docking => Some(command(
            MovementMode::MoveTo,
            MoveTarget::at(plan.home),
            None,
            MovementPriority::PlayerCommand,
            CommandSource::Docking,
        )),
        _ => None,
    }
}

fn post(
    queue: &mut MovementQueue,
    handle: EntityHandle,
    cmd: MovementCommand,
    locomotion: &mut dyn Locomotion,
    events: &mut Vec<CombatEvent>,
) -> AddOutcome {
    let outcome = movement::add_command(queue, handle, cmd, locomotion);
    if outcome == AddOutcome::Rejected {
        debug!(entity = %handle, source = ?cmd.source, "movement command rejected");
        events.push(CombatEvent::MovementRejected {
            entity: handle,
            source: cmd.source,
            priority: cmd.priority,
        });
    }
    outcome
}

struct MovementHooks<'a> {
    handle: EntityHandle,
    queue: &'a mut MovementQueue,
    locomotion: &'a mut dyn Locomotion,
    events: &'a mut Vec<CombatEvent>,
    plan: &'a StatePlan,
    now_ms: Millis,
}

impl StateHooks for MovementHooks<'_> {
    fn on_exit(&mut self, state: NpcState) {
        self.queue.halted = false;
        if let Some(source) = source_for_state(state) {
            movement::withdraw_source(self.queue, self.handle, source, self.locomotion);
        }
    }

    fn on_enter(&mut self, state: NpcState) {
        if state == NpcState::Destroyed {
            movement::emergency_stop(self.queue, self.handle, self.plan.position, self.locomotion);
            return;
        }
        if let Some(cmd) = command_for_state(state, self.plan, self.now_ms) {
            post(self.queue, self.handle, cmd, self.locomotion, self.events);
        }
    }
}

/// Transition `entity` to `to`, running the movement hooks. Returns the state left.
#[allow(clippy::too_many_arguments)]
pub fn change_state(
    world: &mut World,
    entity: Entity,
    handle: EntityHandle,
    to: NpcState,
    plan: &StatePlan,
    locomotion: &mut dyn Locomotion,
    events: &mut Vec<CombatEvent>,
    now_ms: Millis,
) -> EngineResult<NpcState> {
    let (status, queue) = world
        .query_one_mut::<(&mut NpcStatus, &mut MovementQueue)>(entity)
        .map_err(|_| EngineError::UnknownEntity(handle))?;
    let from = status.state;

    let mut hooks = MovementHooks {
        handle,
        queue,
        locomotion,
        events: &mut *events,
        plan,
        now_ms,
    };
    fsm::transition_to(status, to, now_ms, &mut hooks).map_err(|source| {
        EngineError::Transition {
            entity: handle,
            source,
        }
    })?;

    events.push(CombatEvent::StateChanged {
        entity: handle,
        from,
        to,
        at_ms: now_ms,
    });
    Ok(from)
}

/// Emit acquisition/switch events when a lock changed.
pub(crate) fn report_lock_change(
    handle: EntityHandle,
    before: Option<EntityHandle>,
    stab: &TargetStabilization,
    events: &mut Vec<CombatEvent>,
) {
    match (before, stab.current_target) {
        (None, Some(target)) => {
            debug!(entity = %handle, %target, score = stab.target_score, "target acquired");
            events.push(CombatEvent::TargetAcquired {
                entity: handle,
                target,
                score: stab.target_score,
            });
        }
        (Some(from), Some(to)) if from != to => {
            debug!(entity = %handle, %from, %to, score = stab.target_score, "target switched");
            events.push(CombatEvent::TargetSwitched {
                entity: handle,
                from,
                to,
                score: stab.target_score,
            });
        }
        _ => {}
    }
}

/// Run threat assessment, decision and the state machine for every combatant.
pub fn run(world: &mut World, picture: &Picture, svc: &mut Services<'_>) {
    for me in picture.iter() {
        if matches!(me.state, NpcState::Destroyed | NpcState::Docked) {
            continue;
        }
        if let Err(err) = think(world, me, picture, svc) {
            warn!(entity = %me.handle, %err, "npc update skipped");
        }
    }
}

fn contacts_of(me: &Blip, radar_range: f32, picture: &Picture, svc: &Services<'_>) -> Vec<Contact> {
    picture
        .iter()
        .filter(|b| b.handle != me.handle && b.is_targetable())
        .filter(|b| me.position.distance(b.position) <= radar_range)
        .map(|b| Contact {
            handle: b.handle,
            position: b.position,
            relation: svc
                .oracle
                .relation(&me.faction, &b.faction, Some(&me.overrides)),
            hostile: sensors::is_hostile(svc.oracle, me, b),
        })
        .collect()
}

fn think(world: &mut World, me: &Blip, picture: &Picture, svc: &mut Services<'_>) -> EngineResult<()> {
    let catalog = svc.catalog;
    let tuning = &catalog.tuning;
    let now_ms = svc.now_ms;
    let entity = me.entity;

    let combatant: Combatant = read(world, entity, me.handle)?;
    let profile = catalog.ai_profile(&combatant.ai_profile_key)?;
    let combat = catalog.combat_profile(&combatant.combat_profile_key)?;
    let hull: Hull = read(world, entity, me.handle)?;
    let status: NpcStatus = read(world, entity, me.handle)?;
    let aggression: Aggression = read(world, entity, me.handle)?;
    let damage_log: DamageLog = read(world, entity, me.handle)?;
    let orders: PlayerOrders = read(world, entity, me.handle)?;
    let previous_intent: Intent = read(world, entity, me.handle)?;
    let mut stab: TargetStabilization = read(world, entity, me.handle)?;

    let contacts = contacts_of(me, profile.radar_range, picture, svc);
    let hostile_in_radar = contacts.iter().any(|c| c.hostile);

    let verdict = if matches!(
        status.state,
        NpcState::CombatSeeking | NpcState::CombatAttacking
    ) {
        let threats = targeting::assess_threats(&aggression, me.position, now_ms, tuning, |h| {
            picture.targetable(h).map(|b| b.position)
        });
        let input = DecisionInput {
            handle: me.handle,
            now_ms,
            position: me.position,
            hp: hull.hp,
            hp_max: hull.hp_max,
            profile,
            combat,
            tuning,
            aggression: &aggression,
            damage_log: &damage_log,
            contacts: &contacts,
            threats: &threats,
            assigned_target: orders.assigned_target,
        };
        let before = stab.current_target;
        let made = decision::make_combat_decision(&input, &mut stab);
        report_lock_change(me.handle, before, &stab, svc.events);
        Some(made).filter(|d| {
            decision::decision_is_valid(d, |h| picture.get(h).map(|b| (b.active, b.state)))
        })
    } else {
        None
    };

    let intent = match &verdict {
        Some(d) => decision::intent_for(d),
        None if status.state == NpcState::CombatFleeing => previous_intent.current,
        None => None,
    };
    if let Some(d) = &verdict {
        if intent != previous_intent.current {
            debug!(entity = %me.handle, action = ?d.action, reason = ?d.reason, priority = d.priority, "combat decision");
            svc.events.push(CombatEvent::DecisionMade {
                entity: me.handle,
                action: d.action,
                target: d.target,
                priority: d.priority,
                reason: d.reason,
            });
        }
    }
    {
        let (stab_slot, intent_slot) = world
            .query_one_mut::<(&mut TargetStabilization, &mut Intent)>(entity)
            .map_err(|_| EngineError::UnknownEntity(me.handle))?;
        *stab_slot = stab;
        intent_slot.current = intent;
    }

    let target_in_radar = verdict.as_ref().is_some_and(|d| {
        d.action == DecisionAction::Attack
            && d.target
                .is_some_and(|t| contacts.iter().any(|c| c.handle == t))
    });
    let update = fsm::evaluate(&NpcContext {
        status: &status,
        now_ms,
        behavior: profile.behavior,
        has_trade_route: combatant.trade_destination.is_some(),
        aggression: aggression.level,
        hostile_in_radar,
        target_in_radar,
        decision: verdict.as_ref(),
        tuning,
    });
    if let Ok(mut slot) = world.get::<&mut NpcStatus>(entity) {
        slot.calm_since_ms = update.calm_since_ms;
    }

    if let Some(next) = update.next {
        let plan = plan_for(world, entity, catalog, |h| picture.get(h).map(|b| b.position));
        change_state(
            world,
            entity,
            me.handle,
            next,
            &plan,
            svc.locomotion,
            svc.events,
            now_ms,
        )?;
    }

    refresh_movement(world, entity, me.handle, picture, svc)
}

/// Re-post the state's own intent when it lapsed, went stale, or now chases
/// something else. Intents of other sources are left alone, and nothing is
/// posted while an emergency stop holds.
fn refresh_movement(
    world: &mut World,
    entity: Entity,
    handle: EntityHandle,
    picture: &Picture,
    svc: &mut Services<'_>,
) -> EngineResult<()> {
    let state = read::<NpcStatus>(world, entity, handle)?.state;
    let plan = plan_for(world, entity, svc.catalog, |h| picture.get(h).map(|b| b.position));
    let Some(desired) = command_for_state(state, &plan, svc.now_ms) else {
        return Ok(());
    };

    let mut queue = world
        .get::<&mut MovementQueue>(entity)
        .map_err(|_| EngineError::UnknownEntity(handle))?;
    if queue.halted {
        return Ok(());
    }
    let stale = match queue.current {
        None => true,
        Some(current) if current.source == desired.source => {
            current.target.entity != desired.target.entity
                || svc.now_ms.saturating_sub(current.timestamp_ms)
                    >= svc.catalog.tuning.pursuit_refresh_ms
        }
        Some(_) => false,
    };
    if stale {
        movement::add_command(&mut queue, handle, desired, svc.locomotion);
    }
    Ok(())
}
