//! Aggression tracking.
//!
//! Pure functions over the [`Aggression`] component. The level only rises
//! through [`register_damage`] and only falls through [`decay`].

use starfray_core::catalog::Tuning;
use starfray_core::components::{Aggression, DamageSource};
use starfray_core::enums::NpcState;
use starfray_core::types::{EntityHandle, Millis};

/// Fresh aggression state using the tuned cooldown rate.
pub fn new_aggression(tuning: &Tuning) -> Aggression {
    Aggression {
        cooldown_rate: tuning.aggression_cooldown_rate,
        ..Aggression::default()
    }
}

/// Record a hit. Returns the new level.
pub fn register_damage(
    aggression: &mut Aggression,
    amount: f32,
    attacker: Option<EntityHandle>,
    now_ms: Millis,
    tuning: &Tuning,
) -> f32 {
    let amount = amount.max(0.0);
    aggression.level = (aggression.level + amount * tuning.aggression_per_damage).clamp(0.0, 1.0);
    aggression.last_damage_ms = Some(now_ms);

    if let Some(attacker) = attacker {
        let source = aggression.sources.entry(attacker).or_insert(DamageSource {
            damage: 0.0,
            last_ms: now_ms,
        });
        source.damage += amount;
        source.last_ms = now_ms;
    }
    aggression.level
}

/// Whether a hit taken in `state` should snap the NPC into `CombatSeeking`.
pub fn provokes(state: NpcState) -> bool {
    state.is_passive()
}

/// Note that the entity just took a combat action (fired, engaged).
pub fn mark_combat(aggression: &mut Aggression, now_ms: Millis) {
    aggression.last_combat_ms = Some(now_ms);
}

fn quiet_for(last: Option<Millis>, now_ms: Millis, quiet_ms: Millis) -> bool {
    match last {
        Some(t) => now_ms.saturating_sub(t) > quiet_ms,
        None => true,
    }
}

/// Cool the level down once both damage and combat have been quiet long enough.
pub fn decay(aggression: &mut Aggression, now_ms: Millis, dt_ms: Millis, tuning: &Tuning) {
    if aggression.level <= 0.0 {
        return;
    }
    let damage_quiet = quiet_for(
        aggression.last_damage_ms,
        now_ms,
        tuning.aggression_damage_quiet_ms,
    );
    let combat_quiet = quiet_for(
        aggression.last_combat_ms,
        now_ms,
        tuning.aggression_combat_quiet_ms,
    );
    if damage_quiet && combat_quiet {
        let dt = dt_ms as f32 / 1000.0;
        aggression.level = (aggression.level - aggression.cooldown_rate * dt).max(0.0);
    }
}

/// Forget attackers that have not hit within the source window.
pub fn prune_sources(aggression: &mut Aggression, now_ms: Millis, tuning: &Tuning) {
    let window = tuning.aggression_source_window_ms;
    aggression
        .sources
        .retain(|_, s| now_ms.saturating_sub(s.last_ms) <= window);
}

/// Per-tick maintenance: decay, then prune.
pub fn update(aggression: &mut Aggression, now_ms: Millis, dt_ms: Millis, tuning: &Tuning) {
    decay(aggression, now_ms, dt_ms, tuning);
    prune_sources(aggression, now_ms, tuning);
}

/// Drop a destroyed attacker.
pub fn forget_source(aggression: &mut Aggression, handle: EntityHandle) {
    aggression.sources.remove(&handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_raises_level_and_records_source() {
        let tuning = Tuning::default();
        let mut aggr = new_aggression(&tuning);
        let level = register_damage(&mut aggr, 40.0, Some(EntityHandle(7)), 0, &tuning);
        assert!((level - 0.4).abs() < 1e-6);
        assert_eq!(aggr.sources[&EntityHandle(7)].damage, 40.0);
        assert_eq!(aggr.last_damage_ms, Some(0));
    }

    #[test]
    fn test_level_saturates_at_one() {
        let tuning = Tuning::default();
        let mut aggr = new_aggression(&tuning);
        register_damage(&mut aggr, 80.0, None, 0, &tuning);
        register_damage(&mut aggr, 80.0, None, 10, &tuning);
        assert_eq!(aggr.level, 1.0);
    }

    #[test]
    fn test_no_decay_during_quiet_period() {
        let tuning = Tuning::default();
        let mut aggr = new_aggression(&tuning);
        register_damage(&mut aggr, 50.0, None, 0, &tuning);
        decay(&mut aggr, 4_000, 1_000, &tuning);
        assert!((aggr.level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_recent_combat_blocks_decay() {
        let tuning = Tuning::default();
        let mut aggr = new_aggression(&tuning);
        register_damage(&mut aggr, 50.0, None, 0, &tuning);
        mark_combat(&mut aggr, 8_000);
        decay(&mut aggr, 9_000, 1_000, &tuning);
        assert!((aggr.level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decay_reaches_zero() {
        let tuning = Tuning::default();
        let mut aggr = new_aggression(&tuning);
        register_damage(&mut aggr, 50.0, None, 0, &tuning);
        let mut now = 5_001;
        for _ in 0..100 {
            decay(&mut aggr, now, 100, &tuning);
            now += 100;
        }
        assert_eq!(aggr.level, 0.0);
    }

    #[test]
    fn test_prune_old_sources() {
        let tuning = Tuning::default();
        let mut aggr = new_aggression(&tuning);
        register_damage(&mut aggr, 5.0, Some(EntityHandle(1)), 0, &tuning);
        register_damage(&mut aggr, 5.0, Some(EntityHandle(2)), 20_000, &tuning);
        prune_sources(&mut aggr, 30_001, &tuning);
        assert!(!aggr.sources.contains_key(&EntityHandle(1)));
        assert!(aggr.sources.contains_key(&EntityHandle(2)));
    }

    #[test]
    fn test_passive_states_are_provoked() {
        assert!(provokes(NpcState::Idle));
        assert!(provokes(NpcState::Trading));
        assert!(!provokes(NpcState::CombatFleeing));
        assert!(!provokes(NpcState::Docked));
    }
}
