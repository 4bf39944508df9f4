use starfray_core::enums::NpcState;

/// Why a state transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("transition {from:?} -> {to:?} is forbidden")]
    Forbidden { from: NpcState, to: NpcState },

    #[error("already in {0:?}")]
    Unchanged(NpcState),
}
