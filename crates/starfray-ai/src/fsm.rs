//! NPC behavior finite state machine.
//!
//! Two layers:
//! - [`transition_to`] applies a transition to an [`NpcStatus`], enforcing the
//!   forbidden-transition table and running exit/enter hooks.
//! - [`evaluate`] computes the automatic transition for one tick from plain
//!   data. No ECS dependency.

use starfray_core::catalog::Tuning;
use starfray_core::components::NpcStatus;
use starfray_core::enums::{Behavior, DecisionAction, NpcState};
use starfray_core::types::Millis;
use tracing::debug;

use crate::decision::CombatDecision;
use crate::error::TransitionError;

/// Side effects of entering and leaving states (movement intents, visuals).
pub trait StateHooks {
    fn on_exit(&mut self, state: NpcState);
    fn on_enter(&mut self, state: NpcState);
}

/// Whether the transition table permits `from -> to`.
pub fn is_transition_allowed(from: NpcState, to: NpcState) -> bool {
    !matches!(
        (from, to),
        (NpcState::Destroyed, _)
            | (NpcState::Docking, NpcState::Trading)
            | (NpcState::Undocking, NpcState::Docking)
    )
}

/// Move `status` into `to`: exit hook, bookkeeping, enter hook.
pub fn transition_to(
    status: &mut NpcStatus,
    to: NpcState,
    now_ms: Millis,
    hooks: &mut impl StateHooks,
) -> Result<(), TransitionError> {
    let from = status.state;
    if from == to {
        return Err(TransitionError::Unchanged(from));
    }
    if !is_transition_allowed(from, to) {
        return Err(TransitionError::Forbidden { from, to });
    }

    hooks.on_exit(from);
    status.previous_state = from;
    status.state = to;
    status.state_enter_ms = now_ms;
    status.calm_since_ms = None;
    hooks.on_enter(to);

    debug!(?from, ?to, now_ms, "npc transition");
    Ok(())
}

/// State a settled NPC falls back to when nothing demands attention.
pub fn base_state(behavior: Behavior, has_trade_route: bool) -> NpcState {
    match behavior {
        Behavior::Aggressive | Behavior::Patrol => NpcState::Patrolling,
        Behavior::Trader if has_trade_route => NpcState::Trading,
        Behavior::Trader | Behavior::Defensive | Behavior::Idle => NpcState::Idle,
    }
}

/// Input to the per-tick state evaluation for one NPC.
pub struct NpcContext<'a> {
    pub status: &'a NpcStatus,
    pub now_ms: Millis,
    pub behavior: Behavior,
    pub has_trade_route: bool,
    pub aggression: f32,
    /// A hostile contact is inside radar range.
    pub hostile_in_radar: bool,
    /// The locked target is still a valid contact inside radar range.
    pub target_in_radar: bool,
    /// Decision synthesized this tick, for combat states.
    pub decision: Option<&'a CombatDecision>,
    pub tuning: &'a Tuning,
}

/// Output of the per-tick state evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcUpdate {
    /// Requested transition, if any.
    pub next: Option<NpcState>,
    /// New calm tracking value for `CombatFleeing`.
    pub calm_since_ms: Option<Millis>,
}

/// Compute this tick's automatic transition.
pub fn evaluate(ctx: &NpcContext<'_>) -> NpcUpdate {
    let status = ctx.status;
    let elapsed = ctx.now_ms.saturating_sub(status.state_enter_ms);
    let base = base_state(ctx.behavior, ctx.has_trade_route);
    let keep_calm = status.calm_since_ms;

    let next = match status.state {
        NpcState::Spawning if elapsed >= ctx.tuning.spawn_settle_ms => Some(base),
        NpcState::Undocking if elapsed >= ctx.tuning.undock_duration_ms => Some(base),

        NpcState::Idle | NpcState::Patrolling | NpcState::Trading
            if ctx.behavior == Behavior::Aggressive && ctx.hostile_in_radar =>
        {
            Some(NpcState::CombatSeeking)
        }

        NpcState::CombatSeeking => match ctx.decision.map(|d| d.action) {
            Some(DecisionAction::Attack) => Some(NpcState::CombatAttacking),
            Some(DecisionAction::Flee | DecisionAction::Retreat) => Some(NpcState::CombatFleeing),
            Some(DecisionAction::Patrol) => Some(base),
            None => None,
        },

        NpcState::CombatAttacking => {
            if ctx.decision.is_some_and(|d| d.is_evasive()) {
                Some(NpcState::CombatFleeing)
            } else if !ctx.target_in_radar {
                Some(NpcState::CombatSeeking)
            } else {
                None
            }
        }

        NpcState::CombatFleeing => {
            if ctx.aggression < ctx.tuning.flee_calm_threshold {
                let since = keep_calm.unwrap_or(ctx.now_ms);
                let calmed = ctx.now_ms.saturating_sub(since) >= ctx.tuning.flee_calm_dwell_ms;
                return NpcUpdate {
                    next: calmed.then_some(NpcState::CombatSeeking),
                    calm_since_ms: Some(since),
                };
            }
            return NpcUpdate {
                next: None,
                calm_since_ms: None,
            };
        }

        _ => None,
    };

    NpcUpdate {
        next,
        calm_since_ms: keep_calm,
    }
}
