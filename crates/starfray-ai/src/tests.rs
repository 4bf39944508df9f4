#[cfg(test)]
mod tests {
    use glam::Vec2;
    use proptest::prelude::*;
    use starfray_core::catalog::Tuning;
    use starfray_core::components::*;
    use starfray_core::enums::*;
    use starfray_core::interfaces::FactionOracle;
    use starfray_core::presets::*;
    use starfray_core::types::{EntityHandle, FactionId, Millis};

    use crate::aggression;
    use crate::decision::{decision_is_valid, intent_for, make_combat_decision, Contact, DecisionInput};
    use crate::error::TransitionError;
    use crate::factions::{is_confrontational, FactionTable};
    use crate::fsm::{evaluate, is_transition_allowed, transition_to, NpcContext, StateHooks};
    use crate::targeting::{
        assess_threats, evaluate_target, select_stable_target, Candidate, ScoringContext,
    };

    const A: EntityHandle = EntityHandle(1);
    const B: EntityHandle = EntityHandle(2);
    const C: EntityHandle = EntityHandle(3);

    fn log_with(totals: &[(EntityHandle, f32)]) -> DamageLog {
        let mut log = DamageLog::default();
        for &(h, dmg) in totals {
            log.total_by_source.insert(h, dmg);
        }
        log
    }

    fn at_origin(handle: EntityHandle) -> Candidate {
        Candidate {
            handle,
            position: Vec2::ZERO,
        }
    }

    /// A held at score 10 (8 damage + 2 lock bonus), B scoring `2 * b_damage`.
    fn gate_case(b_damage: f32, now_ms: Millis) -> Option<EntityHandle> {
        let tuning = Tuning::default();
        let log = log_with(&[(A, 4.0), (B, b_damage)]);
        let ctx = ScoringContext {
            position: Vec2::ZERO,
            now_ms,
            damage_log: &log,
            tuning: &tuning,
        };
        let mut stab = TargetStabilization {
            current_target: Some(A),
            target_score: 10.0,
            target_switch_ms: 1_000,
            ..TargetStabilization::default()
        };
        select_stable_target(&ctx, &mut stab, &[at_origin(A), at_origin(B)])
    }

    // --- Target analysis ---

    #[test]
    fn test_score_formula() {
        let tuning = Tuning::default();
        let mut log = log_with(&[(A, 10.0)]);
        log.last_time_by_source.insert(A, 1_000);
        let ctx = ScoringContext {
            position: Vec2::ZERO,
            now_ms: 3_500,
            damage_log: &log,
            tuning: &tuning,
        };
        let candidate = Candidate {
            handle: A,
            position: Vec2::new(500.0, 0.0),
        };
        // 2*10 + 5*(1 - 2.5/5) - 0.002*500 + 2
        let score = evaluate_target(&ctx, Some(A), &candidate);
        assert!((score - (20.0 + 2.5 - 1.0 + 2.0)).abs() < 1e-4, "score = {score}");
    }

    #[test]
    fn test_stranger_scores_on_distance_only() {
        let tuning = Tuning::default();
        let log = DamageLog::default();
        let ctx = ScoringContext {
            position: Vec2::ZERO,
            now_ms: 0,
            damage_log: &log,
            tuning: &tuning,
        };
        let near = evaluate_target(&ctx, None, &Candidate { handle: A, position: Vec2::new(100.0, 0.0) });
        let far = evaluate_target(&ctx, None, &Candidate { handle: B, position: Vec2::new(900.0, 0.0) });
        assert!(near > far);
    }

    #[test]
    fn test_small_advantage_within_period_keeps_target() {
        // 10 vs 11, last switch 500ms ago.
        assert_eq!(gate_case(5.5, 1_500), Some(A));
    }

    #[test]
    fn test_elapsed_period_alone_does_not_switch() {
        assert_eq!(gate_case(5.5, 3_000), Some(A));
    }

    #[test]
    fn test_advantage_alone_does_not_switch() {
        assert_eq!(gate_case(10.0, 1_500), Some(A));
    }

    #[test]
    fn test_period_and_advantage_switch() {
        assert_eq!(gate_case(10.0, 3_000), Some(B));
    }

    #[test]
    fn test_first_target_adopted_immediately() {
        let tuning = Tuning::default();
        let log = log_with(&[(B, 1.0)]);
        let ctx = ScoringContext {
            position: Vec2::ZERO,
            now_ms: 42,
            damage_log: &log,
            tuning: &tuning,
        };
        let mut stab = TargetStabilization::default();
        let picked = select_stable_target(&ctx, &mut stab, &[at_origin(A), at_origin(B)]);
        assert_eq!(picked, Some(B));
        assert_eq!(stab.current_target, Some(B));
        assert_eq!(stab.target_switch_ms, 42);
        assert!((stab.target_score - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_lock_released_when_target_leaves() {
        let tuning = Tuning::default();
        let log = DamageLog::default();
        let ctx = ScoringContext {
            position: Vec2::ZERO,
            now_ms: 1_100,
            damage_log: &log,
            tuning: &tuning,
        };
        let mut stab = TargetStabilization {
            current_target: Some(A),
            target_switch_ms: 1_000,
            ..TargetStabilization::default()
        };
        let picked = select_stable_target(&ctx, &mut stab, &[at_origin(C)]);
        assert_eq!(picked, Some(C));

        let picked = select_stable_target(&ctx, &mut stab, &[]);
        assert_eq!(picked, None);
        assert_eq!(stab.current_target, None);
        assert_eq!(stab.target_score, 0.0);
    }

    #[test]
    fn test_stable_under_repeated_calls() {
        let tuning = Tuning::default();
        let log = log_with(&[(A, 3.0), (B, 3.2)]);
        let mut stab = TargetStabilization::default();
        let candidates = [at_origin(A), at_origin(B)];
        let mut picks = Vec::new();
        for now in (0..10_000).step_by(100) {
            let ctx = ScoringContext {
                position: Vec2::ZERO,
                now_ms: now,
                damage_log: &log,
                tuning: &tuning,
            };
            picks.push(select_stable_target(&ctx, &mut stab, &candidates));
        }
        assert!(picks.iter().all(|p| *p == picks[0]), "target oscillated");
    }

    #[test]
    fn test_threats_sorted_descending() {
        let tuning = Tuning::default();
        let mut aggr = aggression::new_aggression(&tuning);
        aggression::register_damage(&mut aggr, 10.0, Some(A), 0, &tuning);
        aggression::register_damage(&mut aggr, 30.0, Some(B), 0, &tuning);
        aggression::register_damage(&mut aggr, 30.0, Some(C), 0, &tuning);
        let positions = |h: EntityHandle| match h {
            A => Some(Vec2::new(100.0, 0.0)),
            B => Some(Vec2::new(5_000.0, 0.0)),
            _ => None,
        };
        let threats = assess_threats(&aggr, Vec2::ZERO, 0, &tuning, positions);
        // C has no known position and is skipped; B is far enough to be divided down.
        assert_eq!(threats.len(), 2);
        assert_eq!(threats[0].handle, A);
        assert!((threats[0].threat - 10.0).abs() < 1e-4);
        assert!((threats[1].threat - 6.0).abs() < 1e-4);
    }

    // --- Decision synthesis ---

    struct DecisionFixture {
        tuning: Tuning,
        profile: starfray_core::catalog::AiProfile,
        combat: starfray_core::catalog::CombatProfile,
        aggression: Aggression,
        log: DamageLog,
        contacts: Vec<Contact>,
        threats: Vec<crate::targeting::Threat>,
        hp: f32,
        assigned: Option<EntityHandle>,
    }

    impl DecisionFixture {
        fn new(ai_key: &str) -> Self {
            Self {
                tuning: Tuning::default(),
                profile: ai_profile_preset(ai_key).unwrap(),
                combat: combat_profile_preset(COMBAT_STANDARD).unwrap(),
                aggression: Aggression::default(),
                log: DamageLog::default(),
                contacts: Vec::new(),
                threats: Vec::new(),
                hp: 100.0,
                assigned: None,
            }
        }

        fn contact(mut self, handle: EntityHandle, relation: FactionRelation, hostile: bool) -> Self {
            self.contacts.push(Contact {
                handle,
                position: Vec2::new(200.0, 0.0),
                relation,
                hostile,
            });
            self
        }

        fn decide(&self, stab: &mut TargetStabilization) -> crate::decision::CombatDecision {
            let input = DecisionInput {
                handle: EntityHandle(99),
                now_ms: 10_000,
                position: Vec2::ZERO,
                hp: self.hp,
                hp_max: 100.0,
                profile: &self.profile,
                combat: &self.combat,
                tuning: &self.tuning,
                aggression: &self.aggression,
                damage_log: &self.log,
                contacts: &self.contacts,
                threats: &self.threats,
                assigned_target: self.assigned,
            };
            make_combat_decision(&input, stab)
        }
    }

    #[test]
    fn test_aggressive_attacks_hostile() {
        let fx = DecisionFixture::new(AI_RAIDER).contact(B, FactionRelation::Confrontation, true);
        let mut stab = TargetStabilization::default();
        let d = fx.decide(&mut stab);
        assert_eq!(d.action, DecisionAction::Attack);
        assert_eq!(d.target, Some(B));
        assert_eq!(d.priority, 70.0);
        assert_eq!(d.reason, DecisionReason::AggressiveDisposition);
        assert_eq!(stab.current_target, Some(B));
    }

    #[test]
    fn test_reaction_table_attack() {
        let fx = DecisionFixture::new(AI_MILITIA).contact(B, FactionRelation::Confrontation, true);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Attack);
        assert_eq!(d.reason, DecisionReason::FactionReaction);
    }

    #[test]
    fn test_defensive_ignores_neutral() {
        let fx = DecisionFixture::new(AI_MILITIA).contact(B, FactionRelation::Neutral, false);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Patrol);
        assert_eq!(d.priority, 10.0);
        assert_eq!(d.reason, DecisionReason::NoThreat);
        assert_eq!(d.target, None);
    }

    #[test]
    fn test_retaliation_priority() {
        let mut fx = DecisionFixture::new(AI_MILITIA).contact(B, FactionRelation::Neutral, false);
        fx.log.total_by_source.insert(B, 40.0);
        fx.log.last_time_by_source.insert(B, 8_000);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Attack);
        assert_eq!(d.reason, DecisionReason::Retaliation);
        assert!((d.priority - 64.0).abs() < 1e-4);
    }

    #[test]
    fn test_stale_attacker_not_retaliated() {
        let mut fx = DecisionFixture::new(AI_MILITIA).contact(B, FactionRelation::Neutral, false);
        fx.log.total_by_source.insert(B, 40.0);
        fx.log.last_time_by_source.insert(B, 0);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Patrol);
    }

    #[test]
    fn test_non_combatant_flees() {
        let fx = DecisionFixture::new(AI_CIVILIAN).contact(B, FactionRelation::Confrontation, true);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Flee);
        assert_eq!(d.target, Some(B));
        assert_eq!(d.priority, 95.0);
        assert_eq!(d.reason, DecisionReason::NonCombatant);
    }

    #[test]
    fn test_trader_flees_confrontation_faction() {
        let fx = DecisionFixture::new(AI_TRADER)
            .contact(A, FactionRelation::Neutral, false)
            .contact(B, FactionRelation::Confrontation, true);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Flee);
        assert_eq!(d.target, Some(B));
        assert_eq!(d.priority, 80.0);
        assert_eq!(d.reason, DecisionReason::HostileFaction);
    }

    #[test]
    fn test_low_hull_retreats_first() {
        let mut fx = DecisionFixture::new(AI_RAIDER).contact(B, FactionRelation::Confrontation, true);
        fx.hp = 20.0;
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Retreat);
        assert_eq!(d.target, Some(B));
        assert_eq!(d.priority, 90.0);
        assert_eq!(d.reason, DecisionReason::LowHull);
    }

    #[test]
    fn test_overwhelmed_retreat() {
        let mut fx = DecisionFixture::new(AI_RAIDER).contact(B, FactionRelation::Confrontation, true);
        fx.aggression.level = 0.8;
        fx.threats = [A, B, C]
            .iter()
            .map(|&handle| crate::targeting::Threat {
                handle,
                threat: 20.0,
            })
            .collect();
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Retreat);
        assert_eq!(d.target, Some(A));
        assert_eq!(d.priority, 85.0);
        assert_eq!(d.reason, DecisionReason::Overwhelmed);
    }

    #[test]
    fn test_two_threats_do_not_overwhelm() {
        let mut fx = DecisionFixture::new(AI_RAIDER).contact(B, FactionRelation::Confrontation, true);
        fx.aggression.level = 0.8;
        fx.threats = [A, B]
            .iter()
            .map(|&handle| crate::targeting::Threat {
                handle,
                threat: 20.0,
            })
            .collect();
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(d.action, DecisionAction::Attack);
        assert!((d.priority - 90.0).abs() < 1e-4, "70 + threat of B");
    }

    #[test]
    fn test_player_order_ignores_faction() {
        let mut fx = DecisionFixture::new(AI_MILITIA).contact(C, FactionRelation::Ally, false);
        fx.assigned = Some(C);
        let mut stab = TargetStabilization::default();
        let d = fx.decide(&mut stab);
        assert_eq!(d.action, DecisionAction::Attack);
        assert_eq!(d.target, Some(C));
        assert_eq!(d.reason, DecisionReason::PlayerOrder);
        assert_eq!(stab.current_target, Some(C));
        assert_eq!(stab.target_switch_ms, 10_000);
        assert!((stab.target_score + 0.4).abs() < 1e-4, "distance term only");
    }

    #[test]
    fn test_player_order_keeps_existing_lock_time() {
        let mut fx = DecisionFixture::new(AI_MILITIA).contact(C, FactionRelation::Ally, false);
        fx.assigned = Some(C);
        let mut stab = TargetStabilization {
            current_target: Some(C),
            target_switch_ms: 1_000,
            ..TargetStabilization::default()
        };
        fx.decide(&mut stab);
        fx.decide(&mut stab);
        assert_eq!(stab.current_target, Some(C));
        assert_eq!(stab.target_switch_ms, 1_000);
        assert!((stab.target_score - 1.6).abs() < 1e-4, "held-target bonus minus distance");
    }

    #[test]
    fn test_decision_validity() {
        let fx = DecisionFixture::new(AI_RAIDER).contact(B, FactionRelation::Confrontation, true);
        let d = fx.decide(&mut TargetStabilization::default());
        assert!(decision_is_valid(&d, |_| Some((true, NpcState::Patrolling))));
        assert!(!decision_is_valid(&d, |_| Some((true, NpcState::Docked))));
        assert!(!decision_is_valid(&d, |_| Some((false, NpcState::Patrolling))));
        assert!(!decision_is_valid(&d, |_| None));

        let patrol = DecisionFixture::new(AI_RAIDER).decide(&mut TargetStabilization::default());
        assert!(decision_is_valid(&patrol, |_| None));
    }

    #[test]
    fn test_intent_from_decision() {
        let fx = DecisionFixture::new(AI_CIVILIAN).contact(B, FactionRelation::Confrontation, true);
        let d = fx.decide(&mut TargetStabilization::default());
        assert_eq!(
            intent_for(&d),
            Some(CombatIntent {
                kind: IntentKind::Flee,
                target: B
            })
        );
        let patrol = DecisionFixture::new(AI_RAIDER).decide(&mut TargetStabilization::default());
        assert_eq!(intent_for(&patrol), None);
    }

    // --- State machine ---

    #[derive(Default)]
    struct RecordingHooks {
        calls: Vec<(&'static str, NpcState)>,
    }

    impl StateHooks for RecordingHooks {
        fn on_exit(&mut self, state: NpcState) {
            self.calls.push(("exit", state));
        }
        fn on_enter(&mut self, state: NpcState) {
            self.calls.push(("enter", state));
        }
    }

    #[test]
    fn test_forbidden_transitions() {
        assert!(!is_transition_allowed(NpcState::Destroyed, NpcState::Idle));
        assert!(!is_transition_allowed(NpcState::Docking, NpcState::Trading));
        assert!(!is_transition_allowed(NpcState::Undocking, NpcState::Docking));
        assert!(is_transition_allowed(NpcState::Docking, NpcState::Docked));
        assert!(is_transition_allowed(NpcState::Idle, NpcState::Destroyed));
    }

    #[test]
    fn test_transition_runs_hooks_in_order() {
        let mut status = NpcStatus {
            state: NpcState::Idle,
            ..NpcStatus::default()
        };
        let mut hooks = RecordingHooks::default();
        transition_to(&mut status, NpcState::CombatSeeking, 1_234, &mut hooks).unwrap();
        assert_eq!(status.state, NpcState::CombatSeeking);
        assert_eq!(status.previous_state, NpcState::Idle);
        assert_eq!(status.state_enter_ms, 1_234);
        assert_eq!(
            hooks.calls,
            vec![("exit", NpcState::Idle), ("enter", NpcState::CombatSeeking)]
        );
    }

    #[test]
    fn test_rejected_transition_is_noop() {
        let mut status = NpcStatus {
            state: NpcState::Destroyed,
            previous_state: NpcState::CombatAttacking,
            state_enter_ms: 50,
            calm_since_ms: None,
        };
        let mut hooks = RecordingHooks::default();
        let err = transition_to(&mut status, NpcState::Idle, 100, &mut hooks).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Forbidden {
                from: NpcState::Destroyed,
                to: NpcState::Idle
            }
        );
        assert_eq!(status.state, NpcState::Destroyed);
        assert_eq!(status.state_enter_ms, 50);
        assert!(hooks.calls.is_empty());
    }

    fn npc_ctx<'a>(status: &'a NpcStatus, now_ms: Millis, tuning: &'a Tuning) -> NpcContext<'a> {
        NpcContext {
            status,
            now_ms,
            behavior: Behavior::Patrol,
            has_trade_route: false,
            aggression: 0.0,
            hostile_in_radar: false,
            target_in_radar: true,
            decision: None,
            tuning,
        }
    }

    #[test]
    fn test_spawn_settles_into_base_behavior() {
        let tuning = Tuning::default();
        let status = NpcStatus::default();
        assert_eq!(evaluate(&npc_ctx(&status, 500, &tuning)).next, None);
        assert_eq!(
            evaluate(&npc_ctx(&status, 1_000, &tuning)).next,
            Some(NpcState::Patrolling)
        );
    }

    #[test]
    fn test_aggressive_patrol_sees_hostile() {
        let tuning = Tuning::default();
        let status = NpcStatus {
            state: NpcState::Patrolling,
            ..NpcStatus::default()
        };
        let mut ctx = npc_ctx(&status, 5_000, &tuning);
        ctx.hostile_in_radar = true;
        assert_eq!(evaluate(&ctx).next, None, "patrol profile waits to be provoked");
        ctx.behavior = Behavior::Aggressive;
        assert_eq!(evaluate(&ctx).next, Some(NpcState::CombatSeeking));
    }

    #[test]
    fn test_attacking_loses_target() {
        let tuning = Tuning::default();
        let status = NpcStatus {
            state: NpcState::CombatAttacking,
            ..NpcStatus::default()
        };
        let mut ctx = npc_ctx(&status, 5_000, &tuning);
        assert_eq!(evaluate(&ctx).next, None);
        ctx.target_in_radar = false;
        assert_eq!(evaluate(&ctx).next, Some(NpcState::CombatSeeking));
    }

    #[test]
    fn test_fleeing_calms_after_dwell() {
        let tuning = Tuning::default();
        let mut status = NpcStatus {
            state: NpcState::CombatFleeing,
            ..NpcStatus::default()
        };
        let mut ctx = npc_ctx(&status, 10_000, &tuning);
        ctx.aggression = 0.5;
        let update = evaluate(&ctx);
        assert_eq!(update, crate::fsm::NpcUpdate { next: None, calm_since_ms: None });

        ctx.aggression = 0.1;
        let update = evaluate(&ctx);
        assert_eq!(update.next, None);
        assert_eq!(update.calm_since_ms, Some(10_000));

        status.calm_since_ms = Some(10_000);
        let mut ctx = npc_ctx(&status, 12_999, &tuning);
        ctx.aggression = 0.1;
        assert_eq!(evaluate(&ctx).next, None);
        let mut ctx = npc_ctx(&status, 13_000, &tuning);
        ctx.aggression = 0.1;
        assert_eq!(evaluate(&ctx).next, Some(NpcState::CombatSeeking));
    }

    #[test]
    fn test_undocking_returns_to_base() {
        let tuning = Tuning::default();
        let status = NpcStatus {
            state: NpcState::Undocking,
            state_enter_ms: 1_000,
            ..NpcStatus::default()
        };
        let mut ctx = npc_ctx(&status, 3_000, &tuning);
        ctx.behavior = Behavior::Trader;
        ctx.has_trade_route = true;
        assert_eq!(evaluate(&ctx).next, Some(NpcState::Trading));
    }

    // --- Factions ---

    #[test]
    fn test_faction_table_and_overrides() {
        let table = FactionTable::new(FactionRelation::Neutral)
            .with_mutual("pirate", "player", FactionRelation::Confrontation);
        let pirate = FactionId::from("pirate");
        let player = FactionId::from("player");
        let trader = FactionId::from("guild");

        assert_eq!(table.relation(&pirate, &pirate, None), FactionRelation::Ally);
        assert_eq!(table.relation(&pirate, &trader, None), FactionRelation::Neutral);
        assert!(is_confrontational(&table, &pirate, None, &player, None));

        let mut overrides = RelationOverrides::default();
        overrides.by_faction.insert(
            player.clone(),
            RelationOverride {
                relation: FactionRelation::Ally,
                expires_ms: None,
            },
        );
        assert_eq!(
            table.relation(&pirate, &player, Some(&overrides)),
            FactionRelation::Ally
        );
        // The player side still rates the pirate as confrontation.
        assert!(is_confrontational(&table, &pirate, Some(&overrides), &player, None));
    }

    #[test]
    fn test_one_sided_confrontation_counts() {
        let mut table = FactionTable::new(FactionRelation::Neutral);
        let a = FactionId::from("a");
        let b = FactionId::from("b");
        table.set(&a, &b, FactionRelation::Confrontation);
        assert!(is_confrontational(&table, &b, None, &a, None));
    }

    // --- Aggression bounds ---

    proptest! {
        #[test]
        fn prop_aggression_stays_bounded(
            steps in prop::collection::vec((0.0f32..500.0, 0u64..2_000, any::<bool>()), 1..60)
        ) {
            let tuning = Tuning::default();
            let mut aggr = aggression::new_aggression(&tuning);
            let mut now = 0;
            for (amount, dt, hit) in steps {
                now += dt;
                let before = aggr.level;
                if hit {
                    aggression::register_damage(&mut aggr, amount, Some(A), now, &tuning);
                    prop_assert!(aggr.level >= before);
                } else {
                    aggression::update(&mut aggr, now, dt, &tuning);
                    prop_assert!(aggr.level <= before);
                }
                prop_assert!((0.0..=1.0).contains(&aggr.level));
            }
        }
    }
}
