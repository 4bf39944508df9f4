//! Entity spawn factories for setting up the combat world.
//!
//! Builds combatant component bundles from catalog entries, plus a stock
//! skirmish roster used by the demo binary and tests.

use glam::Vec2;
use hecs::{Entity, World};

use starfray_ai::aggression;
use starfray_ai::factions::FactionTable;
use starfray_core::catalog::CombatCatalog;
use starfray_core::components::*;
use starfray_core::enums::{FactionRelation, NpcState};
use starfray_core::presets::*;
use starfray_core::types::{EntityHandle, FactionId, Millis};

use crate::error::EngineResult;

/// Everything needed to register a combatant.
#[derive(Debug, Clone)]
pub struct CombatantSpawn {
    pub faction: FactionId,
    pub ship_key: String,
    pub ai_profile_key: String,
    pub combat_profile_key: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Defaults to the spawn position.
    pub home: Option<Vec2>,
    pub trade_destination: Option<Vec2>,
    /// Requested handle; a fresh one is minted when absent or taken.
    pub handle: Option<EntityHandle>,
    /// Overrides the ship's full hull.
    pub hp: Option<f32>,
    pub state: NpcState,
}

impl CombatantSpawn {
    pub fn new(
        faction: impl Into<FactionId>,
        ship_key: &str,
        ai_profile_key: &str,
        combat_profile_key: &str,
    ) -> Self {
        Self {
            faction: faction.into(),
            ship_key: ship_key.to_owned(),
            ai_profile_key: ai_profile_key.to_owned(),
            combat_profile_key: combat_profile_key.to_owned(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            home: None,
            trade_destination: None,
            handle: None,
            hp: None,
            state: NpcState::Spawning,
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_home(mut self, home: Vec2) -> Self {
        self.home = Some(home);
        self
    }

    pub fn with_trade_route(mut self, destination: Vec2) -> Self {
        self.trade_destination = Some(destination);
        self
    }

    pub fn with_handle(mut self, handle: EntityHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn with_hp(mut self, hp: f32) -> Self {
        self.hp = Some(hp);
        self
    }

    /// Start in `state` instead of `Spawning`.
    pub fn in_state(mut self, state: NpcState) -> Self {
        self.state = state;
        self
    }
}

/// Spawn a combatant's component bundle. The handle is assigned afterwards by
/// the registry; `handle` is only a placeholder until then.
pub fn spawn_combatant(
    world: &mut World,
    catalog: &CombatCatalog,
    spawn: &CombatantSpawn,
    handle: EntityHandle,
    now_ms: Millis,
) -> EngineResult<Entity> {
    let ship = catalog.ship(&spawn.ship_key)?;
    catalog.ai_profile(&spawn.ai_profile_key)?;
    catalog.combat_profile(&spawn.combat_profile_key)?;

    let combatant = Combatant {
        handle,
        faction: spawn.faction.clone(),
        ship_key: spawn.ship_key.clone(),
        ai_profile_key: spawn.ai_profile_key.clone(),
        combat_profile_key: spawn.combat_profile_key.clone(),
        home: spawn.home.unwrap_or(spawn.position),
        trade_destination: spawn.trade_destination,
    };
    let hull = Hull {
        hp: spawn.hp.unwrap_or(ship.hp_max).clamp(0.0, ship.hp_max),
        hp_max: ship.hp_max,
        hit_radius: ship.hit_radius,
        accuracy: ship.accuracy,
    };
    let kinematics = Kinematics {
        position: spawn.position,
        velocity: spawn.velocity,
        active: true,
    };
    let status = NpcStatus {
        state: spawn.state,
        previous_state: spawn.state,
        state_enter_ms: now_ms,
        calm_since_ms: None,
    };
    let stabilization = TargetStabilization {
        required_advantage: catalog.tuning.target_required_advantage,
        stability_period_ms: catalog.tuning.target_stability_period_ms,
        ..TargetStabilization::default()
    };
    let armament = Armament {
        slots: ship
            .weapons
            .iter()
            .map(|key| WeaponSlot {
                weapon_key: key.clone(),
                ..WeaponSlot::default()
            })
            .collect(),
    };

    Ok(world.spawn((
        combatant,
        hull,
        kinematics,
        status,
        aggression::new_aggression(&catalog.tuning),
        stabilization,
        MovementQueue::default(),
        Intent::default(),
        DamageLog::default(),
        RelationOverrides::default(),
        PlayerOrders::default(),
        armament,
    )))
}

pub const FACTION_PIRATES: &str = "pirates";
pub const FACTION_NAVY: &str = "navy";
pub const FACTION_TRADERS: &str = "traders";

/// Relations for the stock skirmish: pirates against everyone, navy escorts
/// traders.
pub fn skirmish_factions() -> FactionTable {
    FactionTable::new(FactionRelation::Neutral)
        .with_mutual(FACTION_PIRATES, FACTION_NAVY, FactionRelation::Confrontation)
        .with_mutual(FACTION_PIRATES, FACTION_TRADERS, FactionRelation::Confrontation)
        .with_mutual(FACTION_NAVY, FACTION_TRADERS, FactionRelation::Ally)
}

/// A pirate raid on an escorted trade convoy.
pub fn skirmish_roster() -> Vec<CombatantSpawn> {
    let pirate = |x: f32, y: f32, ship: &str| {
        CombatantSpawn::new(FACTION_PIRATES, ship, AI_RAIDER, COMBAT_BRAVE).at(Vec2::new(x, y))
    };
    let navy = |x: f32, y: f32, ship: &str| {
        CombatantSpawn::new(FACTION_NAVY, ship, AI_PATROL, COMBAT_STANDARD).at(Vec2::new(x, y))
    };
    vec![
        pirate(-400.0, 150.0, SHIP_FIGHTER),
        pirate(-420.0, -120.0, SHIP_FIGHTER),
        pirate(-700.0, 0.0, SHIP_CORVETTE),
        navy(150.0, 150.0, SHIP_FRIGATE),
        navy(150.0, -150.0, SHIP_FIGHTER),
        CombatantSpawn::new(FACTION_TRADERS, SHIP_FREIGHTER, AI_TRADER, COMBAT_TIMID)
            .at(Vec2::new(0.0, 0.0))
            .with_trade_route(Vec2::new(3_000.0, 0.0)),
        CombatantSpawn::new(FACTION_TRADERS, SHIP_FREIGHTER, AI_CIVILIAN, COMBAT_TIMID)
            .at(Vec2::new(60.0, 40.0)),
    ]
}
