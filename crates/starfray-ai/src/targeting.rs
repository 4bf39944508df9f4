//! Target scoring, hysteresis-stabilized selection, and threat assessment.

use glam::Vec2;
use starfray_core::catalog::Tuning;
use starfray_core::components::{Aggression, DamageLog, TargetStabilization};
use starfray_core::types::{EntityHandle, Millis};

/// What the scorer needs to know about the entity doing the choosing.
pub struct ScoringContext<'a> {
    pub position: Vec2,
    pub now_ms: Millis,
    pub damage_log: &'a DamageLog,
    pub tuning: &'a Tuning,
}

/// A candidate target as seen by the scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub handle: EntityHandle,
    pub position: Vec2,
}

/// One entry of the threat assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threat {
    pub handle: EntityHandle,
    pub threat: f32,
}

fn recency(now_ms: Millis, last_ms: Millis, window_ms: Millis) -> f32 {
    if window_ms == 0 {
        return 0.0;
    }
    let elapsed = now_ms.saturating_sub(last_ms) as f32;
    (1.0 - elapsed / window_ms as f32).clamp(0.0, 1.0)
}

/// Score a candidate. Higher is more attractive.
pub fn evaluate_target(
    ctx: &ScoringContext<'_>,
    current_target: Option<EntityHandle>,
    candidate: &Candidate,
) -> f32 {
    let t = ctx.tuning;
    let damage = ctx
        .damage_log
        .total_by_source
        .get(&candidate.handle)
        .copied()
        .unwrap_or(0.0);
    let recency_bonus = ctx
        .damage_log
        .last_time_by_source
        .get(&candidate.handle)
        .map(|&last| t.score_recency_max * recency(ctx.now_ms, last, t.score_recency_window_ms))
        .unwrap_or(0.0);
    let distance = ctx.position.distance(candidate.position);
    let current_bonus = if current_target == Some(candidate.handle) {
        t.score_current_target_bonus
    } else {
        0.0
    };

    t.score_damage_weight * damage + recency_bonus - t.score_distance_weight * distance
        + current_bonus
}

fn adopt(stab: &mut TargetStabilization, handle: EntityHandle, score: f32, now_ms: Millis) {
    stab.current_target = Some(handle);
    stab.target_score = score;
    stab.target_switch_ms = now_ms;
}

/// Lock onto `candidate` regardless of hysteresis. An existing lock on the
/// same candidate only has its score refreshed.
pub fn force_target(ctx: &ScoringContext<'_>, stab: &mut TargetStabilization, candidate: &Candidate) {
    let score = evaluate_target(ctx, stab.current_target, candidate);
    if stab.current_target == Some(candidate.handle) {
        stab.target_score = score;
    } else {
        adopt(stab, candidate.handle, score, ctx.now_ms);
    }
}

/// Drop the current lock.
pub fn release_target(stab: &mut TargetStabilization) {
    stab.current_target = None;
    stab.target_score = 0.0;
}

/// Pick a target with hysteresis.
///
/// A held target is only replaced once the stability period has elapsed *and*
/// the challenger beats it by the required advantage. A held target that is
/// no longer among the candidates is released first.
pub fn select_stable_target(
    ctx: &ScoringContext<'_>,
    stab: &mut TargetStabilization,
    candidates: &[Candidate],
) -> Option<EntityHandle> {
    if let Some(current) = stab.current_target {
        if !candidates.iter().any(|c| c.handle == current) {
            release_target(stab);
        }
    }

    let mut best: Option<(EntityHandle, f32)> = None;
    let mut current_score = None;
    for candidate in candidates {
        let score = evaluate_target(ctx, stab.current_target, candidate);
        if stab.current_target == Some(candidate.handle) {
            current_score = Some(score);
        }
        let better = match best {
            None => true,
            Some((handle, s)) => score > s || (score == s && candidate.handle < handle),
        };
        if better {
            best = Some((candidate.handle, score));
        }
    }

    let (best_handle, best_score) = best?;

    let (current, current_score) = match (stab.current_target, current_score) {
        (Some(current), Some(score)) => (current, score),
        _ => {
            adopt(stab, best_handle, best_score, ctx.now_ms);
            return Some(best_handle);
        }
    };

    if best_handle == current {
        stab.target_score = current_score;
        return Some(current);
    }

    let settled = ctx.now_ms.saturating_sub(stab.target_switch_ms) > stab.stability_period_ms;
    let decisive = best_score > current_score * (1.0 + stab.required_advantage);
    if settled && decisive {
        adopt(stab, best_handle, best_score, ctx.now_ms);
        Some(best_handle)
    } else {
        stab.target_score = current_score;
        Some(current)
    }
}

/// Rank aggression sources by how threatening they are, most threatening first.
///
/// Sources whose position is unknown are skipped.
pub fn assess_threats(
    aggression: &Aggression,
    position: Vec2,
    now_ms: Millis,
    tuning: &Tuning,
    position_of: impl Fn(EntityHandle) -> Option<Vec2>,
) -> Vec<Threat> {
    let mut threats: Vec<Threat> = aggression
        .sources
        .iter()
        .filter_map(|(&handle, source)| {
            let pos = position_of(handle)?;
            let factor = recency(now_ms, source.last_ms, tuning.threat_recency_window_ms);
            let divisor = (position.distance(pos) * tuning.threat_distance_scale).max(1.0);
            Some(Threat {
                handle,
                threat: source.damage * factor / divisor,
            })
        })
        .collect();
    threats.sort_by(|a, b| {
        b.threat
            .total_cmp(&a.threat)
            .then_with(|| a.handle.cmp(&b.handle))
    });
    threats
}

/// Mean threat value, zero for an empty list.
pub fn mean_threat(threats: &[Threat]) -> f32 {
    if threats.is_empty() {
        return 0.0;
    }
    threats.iter().map(|t| t.threat).sum::<f32>() / threats.len() as f32
}
