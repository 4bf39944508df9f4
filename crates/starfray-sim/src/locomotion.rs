//! A recording locomotion collaborator for tests.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::Serialize;
use starfray_core::enums::{MovementMode, VisualKind};
use starfray_core::interfaces::Locomotion;
use starfray_core::types::{EntityHandle, MoveTarget, VisualHandle};

/// One call received by a [`RecordingLocomotion`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LocomotionCall {
    SetMode {
        entity: EntityHandle,
        mode: MovementMode,
        distance: Option<f32>,
    },
    SetTarget {
        entity: EntityHandle,
        target: MoveTarget,
    },
    SpawnVisual {
        kind: VisualKind,
        visual: VisualHandle,
    },
    DestroyVisual {
        visual: VisualHandle,
    },
}

/// Records every call and tracks which owned visuals are alive.
#[derive(Debug, Default)]
pub struct RecordingLocomotion {
    pub calls: Vec<LocomotionCall>,
    next_visual: u32,
    live_visuals: BTreeSet<VisualHandle>,
}

impl RecordingLocomotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest mode and target forwarded for `entity`.
    pub fn last_order(&self, entity: EntityHandle) -> (Option<MovementMode>, Option<MoveTarget>) {
        let mut mode = None;
        let mut target = None;
        for call in self.calls.iter().rev() {
            match call {
                LocomotionCall::SetMode { entity: e, mode: m, .. } if *e == entity && mode.is_none() => {
                    mode = Some(*m);
                }
                LocomotionCall::SetTarget { entity: e, target: t } if *e == entity && target.is_none() => {
                    target = Some(*t);
                }
                _ => {}
            }
            if mode.is_some() && target.is_some() {
                break;
            }
        }
        (mode, target)
    }

    pub fn live_visuals(&self) -> usize {
        self.live_visuals.len()
    }

    pub fn visuals_spawned(&self, kind: VisualKind) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, LocomotionCall::SpawnVisual { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Locomotion for RecordingLocomotion {
    fn set_mode(&mut self, entity: EntityHandle, mode: MovementMode, distance: Option<f32>) {
        self.calls.push(LocomotionCall::SetMode {
            entity,
            mode,
            distance,
        });
    }

    fn set_target(&mut self, entity: EntityHandle, target: MoveTarget) {
        self.calls.push(LocomotionCall::SetTarget { entity, target });
    }

    fn spawn_visual(&mut self, kind: VisualKind, _position: Vec2, _heading: f32) -> VisualHandle {
        let visual = VisualHandle(self.next_visual);
        self.next_visual += 1;
        if kind != VisualKind::Impact {
            self.live_visuals.insert(visual);
        }
        self.calls.push(LocomotionCall::SpawnVisual { kind, visual });
        visual
    }

    fn destroy_visual(&mut self, visual: VisualHandle) {
        self.live_visuals.remove(&visual);
        self.calls.push(LocomotionCall::DestroyVisual { visual });
    }
}
