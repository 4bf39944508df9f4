//! Narrow interfaces to the collaborators the engine does not own.

use glam::Vec2;

use crate::components::RelationOverrides;
use crate::enums::{FactionRelation, MovementMode, VisualKind};
use crate::types::{EntityHandle, FactionId, MoveTarget, VisualHandle};

/// The world/locomotion side: moves ships and draws effects.
///
/// The engine only tells it outcomes; it never reads combat state back.
pub trait Locomotion {
    fn set_mode(&mut self, entity: EntityHandle, mode: MovementMode, distance: Option<f32>);

    fn set_target(&mut self, entity: EntityHandle, target: MoveTarget);

    /// Impact visuals are fire-and-forget: the engine never destroys them.
    fn spawn_visual(&mut self, kind: VisualKind, position: Vec2, heading: f32) -> VisualHandle;

    fn destroy_visual(&mut self, visual: VisualHandle);
}

/// Answers "how does faction `from` regard faction `to`".
pub trait FactionOracle {
    /// `overrides` are the per-entity overrides held by the `from` side.
    fn relation(
        &self,
        from: &FactionId,
        to: &FactionId,
        overrides: Option<&RelationOverrides>,
    ) -> FactionRelation;
}
