//! Pause-aware task queue for delayed weapon effects.
//!
//! Every delayed effect (burst sub-shots, beam phases, projectile lifetimes)
//! is a typed [`ScheduledTask`] registered at an absolute due time. The clock
//! only moves through [`Scheduler::advance`], which does nothing while paused.
//! Tasks due at the same time pop in registration order.

use std::collections::{BTreeMap, HashMap};

use starfray_core::types::{EntityHandle, Millis, TimerId};

/// A delayed effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// A follow-up shot of a burst.
    BurstShot {
        shooter: EntityHandle,
        slot: usize,
        target: EntityHandle,
    },
    /// Beam finished preparing; connect if the target is still valid.
    BeamActivate { shooter: EntityHandle, slot: usize },
    /// One damage tick of an active beam.
    BeamTick { shooter: EntityHandle, slot: usize },
    /// Beam cooldown finished.
    BeamReady { shooter: EntityHandle, slot: usize },
    /// Projectile lifetime ran out.
    ProjectileExpiry { projectile: hecs::Entity },
}

impl ScheduledTask {
    /// The combatant whose weapon owns this task.
    pub fn owner(&self) -> Option<EntityHandle> {
        match *self {
            Self::BurstShot { shooter, .. }
            | Self::BeamActivate { shooter, .. }
            | Self::BeamTick { shooter, .. }
            | Self::BeamReady { shooter, .. } => Some(shooter),
            Self::ProjectileExpiry { .. } => None,
        }
    }

    /// Whether the task mentions `handle` as owner or target.
    pub fn references(&self, handle: EntityHandle) -> bool {
        match *self {
            Self::BurstShot { shooter, target, .. } => shooter == handle || target == handle,
            _ => self.owner() == Some(handle),
        }
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: Millis,
    paused: bool,
    next_id: u64,
    queue: BTreeMap<(Millis, TimerId), ScheduledTask>,
    due_by_id: HashMap<TimerId, Millis>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Millis {
        self.now_ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Move the clock forward. Frozen while paused.
    pub fn advance(&mut self, delta_ms: Millis) {
        if !self.paused {
            self.now_ms += delta_ms;
        }
    }

    /// Schedule `task` to run `delay_ms` from now.
    pub fn register(&mut self, delay_ms: Millis, task: ScheduledTask) -> TimerId {
        self.register_at(self.now_ms + delay_ms, task)
    }

    /// Schedule `task` at an absolute time.
    pub fn register_at(&mut self, due_ms: Millis, task: ScheduledTask) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((due_ms, id), task);
        self.due_by_id.insert(id, due_ms);
        id
    }

    /// Cancel a task. Unknown or already-run ids are ignored.
    pub fn unregister(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id) {
            Some(due) => self.queue.remove(&(due, id)).is_some(),
            None => false,
        }
    }

    /// Cancel every task matching `pred`. Returns how many were removed.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&ScheduledTask) -> bool) -> usize {
        let doomed: Vec<(Millis, TimerId)> = self
            .queue
            .iter()
            .filter(|(_, task)| pred(task))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.queue.remove(key);
            self.due_by_id.remove(&key.1);
        }
        doomed.len()
    }

    /// Cancel every task owned by `handle`.
    pub fn cancel_owned_by(&mut self, handle: EntityHandle) -> usize {
        self.cancel_where(|task| task.owner() == Some(handle))
    }

    /// Pop the earliest task due at or before now.
    pub fn pop_due(&mut self) -> Option<(TimerId, Millis, ScheduledTask)> {
        let (&(due, id), _) = self.queue.first_key_value()?;
        if due > self.now_ms {
            return None;
        }
        let task = self.queue.remove(&(due, id))?;
        self.due_by_id.remove(&id);
        Some((id, due, task))
    }

    pub fn is_registered(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pending tasks, earliest first.
    pub fn iter(&self) -> impl Iterator<Item = (Millis, &ScheduledTask)> {
        self.queue.iter().map(|(&(due, _), task)| (due, task))
    }
}
