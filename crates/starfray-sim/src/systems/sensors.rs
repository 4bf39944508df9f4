//! Sensor picture: a per-tick, handle-sorted view of every live combatant.
//!
//! Built once at the start of a tick and shared read-only by the decision,
//! fire-control, and collision systems.

use glam::Vec2;
use hecs::{Entity, World};
use starfray_ai::factions::is_confrontational;
use starfray_core::components::*;
use starfray_core::enums::NpcState;
use starfray_core::interfaces::FactionOracle;
use starfray_core::types::{EntityHandle, FactionId, Millis};

/// One combatant as seen this tick.
#[derive(Debug, Clone)]
pub struct Blip {
    pub handle: EntityHandle,
    pub entity: Entity,
    pub faction: FactionId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub active: bool,
    pub state: NpcState,
    pub hp: f32,
    pub hit_radius: f32,
    pub overrides: RelationOverrides,
}

impl Blip {
    /// Can be chosen as a target: active, alive, and outside the docking family.
    pub fn is_targetable(&self) -> bool {
        self.active
            && self.hp > 0.0
            && self.state != NpcState::Destroyed
            && !self.state.is_docking_family()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Picture {
    blips: Vec<Blip>,
}

impl Picture {
    pub fn get(&self, handle: EntityHandle) -> Option<&Blip> {
        self.blips
            .binary_search_by_key(&handle, |b| b.handle)
            .ok()
            .map(|i| &self.blips[i])
    }

    pub fn targetable(&self, handle: EntityHandle) -> Option<&Blip> {
        self.get(handle).filter(|b| b.is_targetable())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blip> {
        self.blips.iter()
    }

    pub fn handles(&self) -> Vec<(EntityHandle, Entity)> {
        self.blips.iter().map(|b| (b.handle, b.entity)).collect()
    }

    pub fn len(&self) -> usize {
        self.blips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blips.is_empty()
    }
}

/// Snapshot every combatant.
pub fn build(world: &World) -> Picture {
    let mut blips: Vec<Blip> = world
        .query::<(&Combatant, &Kinematics, &NpcStatus, &Hull, &RelationOverrides)>()
        .iter()
        .map(|(entity, (combatant, kin, status, hull, overrides))| Blip {
            handle: combatant.handle,
            entity,
            faction: combatant.faction.clone(),
            position: kin.position,
            velocity: kin.velocity,
            active: kin.active,
            state: status.state,
            hp: hull.hp,
            hit_radius: hull.hit_radius,
            overrides: overrides.clone(),
        })
        .collect();
    blips.sort_by_key(|b| b.handle);
    Picture { blips }
}

/// Confrontation-rated between two combatants, either direction.
pub fn is_hostile(oracle: &dyn FactionOracle, a: &Blip, b: &Blip) -> bool {
    is_confrontational(
        oracle,
        &a.faction,
        Some(&a.overrides),
        &b.faction,
        Some(&b.overrides),
    )
}

/// Drop relation overrides whose time is up.
pub fn expire_overrides(world: &mut World, now_ms: Millis) {
    for (_entity, overrides) in world.query_mut::<&mut RelationOverrides>() {
        overrides
            .by_faction
            .retain(|_, o| o.expires_ms.map_or(true, |t| t > now_ms));
    }
}
