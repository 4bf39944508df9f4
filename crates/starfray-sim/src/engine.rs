//! Combat engine: the façade hosts drive.
//!
//! `CombatEngine` owns the hecs world, the handle registry and the scheduler,
//! processes player commands at tick boundaries, runs all systems and produces
//! a `CombatSnapshot` per tick. Headless and deterministic for a given seed.

use std::collections::VecDeque;

use glam::Vec2;
use hecs::{Component, Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use starfray_ai::error::TransitionError;
use starfray_ai::targeting;
use starfray_core::catalog::CombatCatalog;
use starfray_core::commands::PlayerCommand;
use starfray_core::components::*;
use starfray_core::constants::DEFAULT_TICK_MS;
use starfray_core::enums::NpcState;
use starfray_core::events::CombatEvent;
use starfray_core::interfaces::{FactionOracle, Locomotion};
use starfray_core::state::CombatSnapshot;
use starfray_core::types::{EntityHandle, Millis, SimTime};

use crate::error::{EngineError, EngineResult};
use crate::movement;
use crate::registry::Registry;
use crate::scheduler::Scheduler;
use crate::systems::{self, npc, sensors, PendingDamage, Services};
use crate::world_setup::{self, CombatantSpawn};

/// Configuration for starting a new engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Simulated milliseconds per `tick()`.
    pub tick_ms: Millis,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

/// The combat engine. Owns the ECS world and all combat state.
pub struct CombatEngine<L: Locomotion> {
    world: World,
    registry: Registry,
    scheduler: Scheduler,
    catalog: CombatCatalog,
    oracle: Box<dyn FactionOracle>,
    locomotion: L,
    rng: ChaCha8Rng,
    time: SimTime,
    tick_ms: Millis,
    command_queue: VecDeque<PlayerCommand>,
    pending_damage: Vec<PendingDamage>,
    events: Vec<CombatEvent>,
}

impl<L: Locomotion> CombatEngine<L> {
    /// Create an engine. Fails if the catalog references missing entries.
    pub fn new(
        config: EngineConfig,
        catalog: CombatCatalog,
        oracle: impl FactionOracle + 'static,
        locomotion: L,
    ) -> EngineResult<Self> {
        catalog.validate()?;
        Ok(Self {
            world: World::new(),
            registry: Registry::new(),
            scheduler: Scheduler::new(),
            catalog,
            oracle: Box::new(oracle),
            locomotion,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            time: SimTime::default(),
            tick_ms: config.tick_ms.max(1),
            command_queue: VecDeque::new(),
            pending_damage: Vec::new(),
            events: Vec::new(),
        })
    }

    // --- Host surface ---

    /// Register a combatant and post its initial state's movement.
    pub fn spawn(&mut self, spawn: CombatantSpawn) -> EngineResult<EntityHandle> {
        let now_ms = self.scheduler.now();
        let entity = world_setup::spawn_combatant(
            &mut self.world,
            &self.catalog,
            &spawn,
            EntityHandle(0),
            now_ms,
        )?;
        let registration = self.registry.register(spawn.handle, entity);
        let handle = registration.handle;
        if let Ok(mut combatant) = self.world.get::<&mut Combatant>(entity) {
            combatant.handle = handle;
        }
        if let Some(requested) = registration.collided {
            self.events.push(CombatEvent::HandleReassigned {
                requested,
                assigned: handle,
            });
        }
        info!(
            entity = %handle,
            faction = %spawn.faction,
            ship = %spawn.ship_key,
            state = ?spawn.state,
            "combatant spawned"
        );

        let picture = sensors::build(&self.world);
        let plan = npc::plan_for(&self.world, entity, &self.catalog, |h| {
            picture.get(h).map(|b| b.position)
        });
        if let Some(cmd) = npc::command_for_state(spawn.state, &plan, now_ms) {
            if let Ok(mut queue) = self.world.get::<&mut MovementQueue>(entity) {
                movement::add_command(&mut queue, handle, cmd, &mut self.locomotion);
            }
        }
        Ok(handle)
    }

    /// Remove a combatant without destroying it, scrubbing every reference.
    pub fn despawn(&mut self, handle: EntityHandle) -> EngineResult<()> {
        if !self.registry.contains(handle) {
            return Err(EngineError::UnknownEntity(handle));
        }
        let mut svc = Services {
            catalog: &self.catalog,
            oracle: self.oracle.as_ref(),
            locomotion: &mut self.locomotion,
            scheduler: &mut self.scheduler,
            rng: &mut self.rng,
            events: &mut self.events,
            now_ms: self.time.now_ms,
            dt_ms: 0,
        };
        systems::cleanup::purge(&mut self.world, &mut self.registry, &mut svc, handle);
        self.events.push(CombatEvent::Despawned { entity: handle });
        info!(entity = %handle, "combatant despawned by host");
        Ok(())
    }

    /// Host-side position/velocity update.
    pub fn set_kinematics(
        &mut self,
        handle: EntityHandle,
        position: Vec2,
        velocity: Vec2,
    ) -> EngineResult<()> {
        let entity = self.entity_of(handle)?;
        let mut kin = self
            .world
            .get::<&mut Kinematics>(entity)
            .map_err(|_| EngineError::UnknownEntity(handle))?;
        kin.position = position;
        kin.velocity = velocity;
        Ok(())
    }

    /// Mark a combatant active (inside the simulated region) or not.
    pub fn set_active(&mut self, handle: EntityHandle, active: bool) -> EngineResult<()> {
        let entity = self.entity_of(handle)?;
        let mut kin = self
            .world
            .get::<&mut Kinematics>(entity)
            .map_err(|_| EngineError::UnknownEntity(handle))?;
        kin.active = active;
        Ok(())
    }

    /// Queue damage from outside the engine (collisions, scripted hits).
    /// Applied in the next tick's damage phase.
    pub fn inflict_damage(
        &mut self,
        target: EntityHandle,
        attacker: Option<EntityHandle>,
        amount: f32,
    ) -> EngineResult<()> {
        self.entity_of(target)?;
        self.pending_damage.push(PendingDamage {
            target,
            attacker,
            amount,
        });
        Ok(())
    }

    /// Queue a player command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: PlayerCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = PlayerCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance by the configured tick length.
    pub fn tick(&mut self) -> CombatSnapshot {
        self.advance(self.tick_ms)
    }

    /// Advance the simulation by `delta_ms` and return the resulting snapshot.
    pub fn advance(&mut self, delta_ms: Millis) -> CombatSnapshot {
        self.process_commands();

        let paused = self.scheduler.is_paused();
        if !paused {
            self.scheduler.advance(delta_ms);
            self.time.tick += 1;
            self.time.now_ms = self.scheduler.now();
            self.run_systems(delta_ms);
        }

        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(&self.world, self.time, paused, events)
    }

    /// Current state without advancing. Carries no events.
    pub fn snapshot(&self) -> CombatSnapshot {
        systems::snapshot::build_snapshot(
            &self.world,
            self.time,
            self.scheduler.is_paused(),
            Vec::new(),
        )
    }

    // --- Queries ---

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn catalog(&self) -> &CombatCatalog {
        &self.catalog
    }

    pub fn locomotion(&self) -> &L {
        &self.locomotion
    }

    pub fn locomotion_mut(&mut self) -> &mut L {
        &mut self.locomotion
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> Vec<EntityHandle> {
        let mut handles: Vec<_> = self.registry.handles().collect();
        handles.sort();
        handles
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<Entity> {
        self.registry.entity(handle)
    }

    /// Copy of one component of a live combatant.
    pub fn get<T: Component + Clone>(&self, handle: EntityHandle) -> Option<T> {
        let entity = self.registry.entity(handle)?;
        self.world.get::<&T>(entity).ok().map(|c| (*c).clone())
    }

    pub fn state_of(&self, handle: EntityHandle) -> Option<NpcState> {
        self.get::<NpcStatus>(handle).map(|s| s.state)
    }

    pub fn current_target(&self, handle: EntityHandle) -> Option<EntityHandle> {
        self.get::<TargetStabilization>(handle)?.current_target
    }

    pub fn hp(&self, handle: EntityHandle) -> Option<f32> {
        self.get::<Hull>(handle).map(|h| h.hp)
    }

    pub fn aggression_level(&self, handle: EntityHandle) -> Option<f32> {
        self.get::<Aggression>(handle).map(|a| a.level)
    }

    pub fn intent(&self, handle: EntityHandle) -> Option<CombatIntent> {
        self.get::<Intent>(handle)?.current
    }

    pub fn movement(&self, handle: EntityHandle) -> Option<MovementCommand> {
        self.get::<MovementQueue>(handle)?.current
    }

    // --- Internals ---

    fn entity_of(&self, handle: EntityHandle) -> EngineResult<Entity> {
        self.registry
            .entity(handle)
            .ok_or(EngineError::UnknownEntity(handle))
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            if let Err(err) = self.apply_command(&command) {
                warn!(?command, %err, "command rejected");
            }
        }
    }

    fn apply_command(&mut self, command: &PlayerCommand) -> EngineResult<()> {
        let now_ms = self.scheduler.now();
        match command {
            PlayerCommand::Pause => {
                self.scheduler.pause();
                info!(now_ms, "simulation paused");
            }
            PlayerCommand::Resume => {
                self.scheduler.resume();
                info!(now_ms, "simulation resumed");
            }
            &PlayerCommand::AssignTarget { entity, target } => {
                if entity == target {
                    return Err(EngineError::SelfTarget(entity));
                }
                let me = self.entity_of(entity)?;
                self.entity_of(target)?;
                {
                    let (orders, stab) = self
                        .world
                        .query_one_mut::<(&mut PlayerOrders, &mut TargetStabilization)>(me)
                        .map_err(|_| EngineError::UnknownEntity(entity))?;
                    orders.assigned_target = Some(target);
                    let before = stab.current_target;
                    if before != Some(target) {
                        targeting::release_target(stab);
                        stab.current_target = Some(target);
                        stab.target_switch_ms = now_ms;
                    }
                    npc::report_lock_change(entity, before, stab, &mut self.events);
                }
                debug!(%entity, %target, "target assigned");
                self.transition(entity, NpcState::CombatAttacking)?;
            }
            &PlayerCommand::ClearAssignment { entity } => {
                let me = self.entity_of(entity)?;
                if let Ok(mut orders) = self.world.get::<&mut PlayerOrders>(me) {
                    orders.assigned_target = None;
                }
            }
            PlayerCommand::SetRelationOverride {
                entity,
                faction,
                relation,
                duration_ms,
            } => {
                let me = self.entity_of(*entity)?;
                let mut overrides = self
                    .world
                    .get::<&mut RelationOverrides>(me)
                    .map_err(|_| EngineError::UnknownEntity(*entity))?;
                overrides.by_faction.insert(
                    faction.clone(),
                    RelationOverride {
                        relation: *relation,
                        expires_ms: duration_ms.map(|d| now_ms + d),
                    },
                );
            }
            PlayerCommand::ClearRelationOverride { entity, faction } => {
                let me = self.entity_of(*entity)?;
                if let Ok(mut overrides) = self.world.get::<&mut RelationOverrides>(me) {
                    overrides.by_faction.remove(faction);
                }
            }
            &PlayerCommand::OrderReturnHome { entity } => {
                self.transition(entity, NpcState::ReturningHome)?;
            }
            &PlayerCommand::OrderDock { entity } => {
                self.require_state(entity, NpcState::ReturningHome, NpcState::Docking)?;
                self.transition(entity, NpcState::Docking)?;
            }
            &PlayerCommand::NotifyDocked { entity } => {
                self.require_state(entity, NpcState::Docking, NpcState::Docked)?;
                self.transition(entity, NpcState::Docked)?;
            }
            &PlayerCommand::EmergencyStop { entity } => {
                let me = self.entity_of(entity)?;
                let (queue, kin) = self
                    .world
                    .query_one_mut::<(&mut MovementQueue, &Kinematics)>(me)
                    .map_err(|_| EngineError::UnknownEntity(entity))?;
                movement::emergency_stop(queue, entity, kin.position, &mut self.locomotion);
            }
        }
        Ok(())
    }

    /// Reject an ordered transition unless the combatant is in `expected`.
    fn require_state(
        &mut self,
        handle: EntityHandle,
        expected: NpcState,
        to: NpcState,
    ) -> EngineResult<()> {
        let from = self
            .state_of(handle)
            .ok_or(EngineError::UnknownEntity(handle))?;
        if from == expected {
            return Ok(());
        }
        self.events.push(CombatEvent::TransitionRejected {
            entity: handle,
            from,
            to,
        });
        Err(EngineError::Transition {
            entity: handle,
            source: TransitionError::Forbidden { from, to },
        })
    }

    /// Ordered state change. Re-entering the current state is a no-op.
    fn transition(&mut self, handle: EntityHandle, to: NpcState) -> EngineResult<()> {
        let entity = self.entity_of(handle)?;
        let picture = sensors::build(&self.world);
        let plan = npc::plan_for(&self.world, entity, &self.catalog, |h| {
            picture.get(h).map(|b| b.position)
        });
        let result = npc::change_state(
            &mut self.world,
            entity,
            handle,
            to,
            &plan,
            &mut self.locomotion,
            &mut self.events,
            self.scheduler.now(),
        );
        match result {
            Ok(_) => Ok(()),
            Err(EngineError::Transition {
                source: TransitionError::Unchanged(_),
                ..
            }) => Ok(()),
            Err(err) => {
                if let EngineError::Transition {
                    source: TransitionError::Forbidden { from, to },
                    ..
                } = &err
                {
                    self.events.push(CombatEvent::TransitionRejected {
                        entity: handle,
                        from: *from,
                        to: *to,
                    });
                }
                Err(err)
            }
        }
    }

    /// Run all systems in order for one tick.
    fn run_systems(&mut self, dt_ms: Millis) {
        let now_ms = self.scheduler.now();
        let world = &mut self.world;
        let mut damage = std::mem::take(&mut self.pending_damage);
        let mut svc = Services {
            catalog: &self.catalog,
            oracle: self.oracle.as_ref(),
            locomotion: &mut self.locomotion,
            scheduler: &mut self.scheduler,
            rng: &mut self.rng,
            events: &mut self.events,
            now_ms,
            dt_ms,
        };

        // 1. Expired relation overrides
        sensors::expire_overrides(world, now_ms);

        // 2. Aggression decay
        systems::aggression::run(world, now_ms, dt_ms, &self.catalog.tuning);

        // 3. Movement intent TTLs
        let picture = sensors::build(world);
        systems::movement::run(world, &picture, &mut svc);

        // 4. Threat assessment, decision, state machine
        systems::npc::run(world, &picture, &mut svc);

        // 5. Fire control sees this tick's states
        let picture = sensors::build(world);
        systems::fire_control::run(world, &picture, &mut svc);

        // 6. Due timers: burst shots, beam ticks, projectile expiry
        systems::scheduled::run(world, &picture, &mut svc, &mut damage);

        // 7. Projectile flight and collision
        systems::projectiles::run(world, &picture, &mut svc, &mut damage);

        // 8. Damage application
        systems::damage::run(world, &self.registry, &picture, &mut svc, damage);

        // 9. Destruction, docking, reference cleanup
        systems::cleanup::run(world, &mut self.registry, &mut svc);
    }
}
