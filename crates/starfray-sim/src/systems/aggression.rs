//! Aggression system: decays hostility and forgets stale damage sources.

use hecs::World;

use starfray_ai::aggression;
use starfray_core::catalog::Tuning;
use starfray_core::components::Aggression;
use starfray_core::types::Millis;

pub fn run(world: &mut World, now_ms: Millis, dt_ms: Millis, tuning: &Tuning) {
    for (_entity, aggr) in world.query_mut::<&mut Aggression>() {
        aggression::update(aggr, now_ms, dt_ms, tuning);
    }
}
