//! Combat decision synthesis.
//!
//! One decision per NPC per tick, evaluated in a fixed precedence:
//! retreat, player order, flee, attack/retaliate, patrol. The first rule that
//! fires wins; its priority and reason are carried along for logging and
//! for the movement coordinator.

use glam::Vec2;
use starfray_core::catalog::{AiProfile, CombatProfile, Tuning};
use starfray_core::components::{Aggression, CombatIntent, DamageLog, TargetStabilization};
use starfray_core::enums::*;
use starfray_core::types::{EntityHandle, Millis};

use crate::targeting::{self, Candidate, ScoringContext, Threat};

/// Another combatant inside radar range, as seen by the deciding NPC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub handle: EntityHandle,
    pub position: Vec2,
    /// How the deciding NPC regards the contact's faction.
    pub relation: FactionRelation,
    /// Confrontation-rated in either direction, overrides included.
    pub hostile: bool,
}

/// Input to the decision synthesis for one NPC.
pub struct DecisionInput<'a> {
    pub handle: EntityHandle,
    pub now_ms: Millis,
    pub position: Vec2,
    pub hp: f32,
    pub hp_max: f32,
    pub profile: &'a AiProfile,
    pub combat: &'a CombatProfile,
    pub tuning: &'a Tuning,
    pub aggression: &'a Aggression,
    pub damage_log: &'a DamageLog,
    /// Attackable combatants inside radar range, sorted by handle.
    pub contacts: &'a [Contact],
    /// Output of [`targeting::assess_threats`].
    pub threats: &'a [Threat],
    pub assigned_target: Option<EntityHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatDecision {
    pub action: DecisionAction,
    pub target: Option<EntityHandle>,
    pub priority: f32,
    pub reason: DecisionReason,
}

impl CombatDecision {
    fn new(
        action: DecisionAction,
        target: Option<EntityHandle>,
        priority: f32,
        reason: DecisionReason,
    ) -> Self {
        Self {
            action,
            target,
            priority,
            reason,
        }
    }

    pub fn is_evasive(&self) -> bool {
        matches!(self.action, DecisionAction::Flee | DecisionAction::Retreat)
    }
}

fn threat_of(threats: &[Threat], handle: EntityHandle) -> f32 {
    threats
        .iter()
        .find(|t| t.handle == handle)
        .map(|t| t.threat)
        .unwrap_or(0.0)
}

fn nearest(position: Vec2, contacts: impl Iterator<Item = Contact>) -> Option<EntityHandle> {
    contacts
        .min_by(|a, b| {
            position
                .distance_squared(a.position)
                .total_cmp(&position.distance_squared(b.position))
                .then_with(|| a.handle.cmp(&b.handle))
        })
        .map(|c| c.handle)
}

/// Whoever threatens us most, else the nearest hostile contact.
fn primary_threat(input: &DecisionInput<'_>) -> Option<EntityHandle> {
    input.threats.first().map(|t| t.handle).or_else(|| {
        nearest(
            input.position,
            input.contacts.iter().copied().filter(|c| c.hostile),
        )
    })
}

fn recent_attacker(input: &DecisionInput<'_>, handle: EntityHandle) -> bool {
    input
        .damage_log
        .last_time_by_source
        .get(&handle)
        .is_some_and(|&t| input.now_ms.saturating_sub(t) < input.tuning.retaliation_window_ms)
}

/// Decide what the NPC should do this tick. May move the target lock in `stab`.
pub fn make_combat_decision(
    input: &DecisionInput<'_>,
    stab: &mut TargetStabilization,
) -> CombatDecision {
    let t = input.tuning;

    // --- Retreat ---
    let hull = if input.hp_max > 0.0 {
        input.hp / input.hp_max
    } else {
        0.0
    };
    if hull <= input.combat.retreat_threshold {
        return CombatDecision::new(
            DecisionAction::Retreat,
            primary_threat(input),
            t.retreat_low_hull_priority,
            DecisionReason::LowHull,
        );
    }
    if input.threats.len() >= t.overwhelmed_threat_count
        && targeting::mean_threat(input.threats) > input.combat.high_threat_cutoff
        && input.aggression.level > t.overwhelmed_aggression
    {
        return CombatDecision::new(
            DecisionAction::Retreat,
            primary_threat(input),
            t.retreat_overwhelmed_priority,
            DecisionReason::Overwhelmed,
        );
    }

    let ctx = ScoringContext {
        position: input.position,
        now_ms: input.now_ms,
        damage_log: input.damage_log,
        tuning: t,
    };

    // --- Player order ---
    if let Some(assigned) = input.assigned_target {
        if let Some(contact) = input.contacts.iter().find(|c| c.handle == assigned) {
            let candidate = Candidate {
                handle: contact.handle,
                position: contact.position,
            };
            targeting::force_target(&ctx, stab, &candidate);
            return CombatDecision::new(
                DecisionAction::Attack,
                Some(assigned),
                t.attack_base_priority + threat_of(input.threats, assigned),
                DecisionReason::PlayerOrder,
            );
        }
    }

    // --- Flee ---
    if input.profile.non_combat {
        if let Some(threat) = primary_threat(input) {
            return CombatDecision::new(
                DecisionAction::Flee,
                Some(threat),
                t.flee_non_combat_priority,
                DecisionReason::NonCombatant,
            );
        }
    }
    if input.profile.behavior == Behavior::Trader {
        let dreaded = input.contacts.iter().copied().filter(|c| {
            c.relation == FactionRelation::Confrontation
                || input.profile.reactions.reaction_to(c.relation) == Reaction::Avoid
        });
        if let Some(threat) = nearest(input.position, dreaded) {
            return CombatDecision::new(
                DecisionAction::Flee,
                Some(threat),
                t.flee_trader_priority,
                DecisionReason::HostileFaction,
            );
        }
    }

    // --- Attack / retaliate ---
    if !input.profile.non_combat {
        let aggressive = input.profile.behavior == Behavior::Aggressive;
        let engages = |c: &Contact| {
            c.hostile
                && (aggressive
                    || input.profile.reactions.reaction_to(c.relation) == Reaction::Attack)
        };
        let candidates: Vec<Candidate> = input
            .contacts
            .iter()
            .filter(|c| engages(*c) || recent_attacker(input, c.handle))
            .map(|c| Candidate {
                handle: c.handle,
                position: c.position,
            })
            .collect();

        if let Some(target) = targeting::select_stable_target(&ctx, stab, &candidates) {
            let contact = input.contacts.iter().find(|c| c.handle == target);
            if contact.is_some_and(engages) {
                let reason = if aggressive {
                    DecisionReason::AggressiveDisposition
                } else {
                    DecisionReason::FactionReaction
                };
                return CombatDecision::new(
                    DecisionAction::Attack,
                    Some(target),
                    t.attack_base_priority + threat_of(input.threats, target),
                    reason,
                );
            }
            let recent_damage = input
                .damage_log
                .total_by_source
                .get(&target)
                .copied()
                .unwrap_or(0.0);
            return CombatDecision::new(
                DecisionAction::Attack,
                Some(target),
                t.retaliate_base_priority + recent_damage * t.retaliate_damage_factor,
                DecisionReason::Retaliation,
            );
        }
    }

    CombatDecision::new(
        DecisionAction::Patrol,
        None,
        t.patrol_priority,
        DecisionReason::NoThreat,
    )
}

/// A decision is valid if its target, when present, is active and outside the
/// docking family. `status_of` returns `(active, state)` or `None` if unknown.
pub fn decision_is_valid(
    decision: &CombatDecision,
    status_of: impl Fn(EntityHandle) -> Option<(bool, NpcState)>,
) -> bool {
    match decision.target {
        None => true,
        Some(target) => match status_of(target) {
            Some((active, state)) => {
                active && !state.is_docking_family() && state != NpcState::Destroyed
            }
            None => false,
        },
    }
}

/// The intent a decision declares to everyone else.
pub fn intent_for(decision: &CombatDecision) -> Option<CombatIntent> {
    let kind = match decision.action {
        DecisionAction::Attack => IntentKind::Attack,
        DecisionAction::Flee => IntentKind::Flee,
        DecisionAction::Retreat => IntentKind::Retreat,
        DecisionAction::Patrol => return None,
    };
    decision.target.map(|target| CombatIntent { kind, target })
}
