//! Movement coordinator: priority arbitration of movement intents.
//!
//! Each combatant carries a [`MovementQueue`]. Only the current command is
//! forwarded to the locomotion collaborator; the queue holds fallbacks that
//! take over when the current command expires, becomes invalid, or is
//! withdrawn. The current command's priority is never below any queued one.

use glam::Vec2;
use starfray_core::components::{MovementCommand, MovementQueue};
use starfray_core::enums::{CommandSource, MovementMode};
use starfray_core::interfaces::Locomotion;
use starfray_core::types::{EntityHandle, Millis, MoveTarget};

/// What [`add_command`] did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Became current and was forwarded.
    Adopted,
    /// Replaced a current command from the same source and priority.
    Refreshed,
    /// Waiting behind an equal-priority current command.
    Queued,
    /// Lower priority than the current command.
    Rejected,
}

fn forward(entity: EntityHandle, cmd: &MovementCommand, locomotion: &mut dyn Locomotion) {
    locomotion.set_mode(entity, cmd.mode, cmd.distance);
    locomotion.set_target(entity, cmd.target);
}

fn insert_sorted(queued: &mut Vec<MovementCommand>, cmd: MovementCommand) {
    // After any existing command of the same priority.
    let at = queued
        .iter()
        .position(|q| q.priority < cmd.priority)
        .unwrap_or(queued.len());
    queued.insert(at, cmd);
}

/// Offer a command to the queue.
pub fn add_command(
    queue: &mut MovementQueue,
    entity: EntityHandle,
    cmd: MovementCommand,
    locomotion: &mut dyn Locomotion,
) -> AddOutcome {
    if let Some(current) = queue.current {
        if current.priority > cmd.priority {
            return AddOutcome::Rejected;
        }
        if current.priority == cmd.priority && current.source == cmd.source {
            queue.current = Some(cmd);
            forward(entity, &cmd, locomotion);
            return AddOutcome::Refreshed;
        }
    }

    queue.queued.retain(|q| q.priority >= cmd.priority);

    match queue.current {
        Some(current) if current.priority >= cmd.priority => {
            insert_sorted(&mut queue.queued, cmd);
            AddOutcome::Queued
        }
        _ => {
            queue.current = Some(cmd);
            forward(entity, &cmd, locomotion);
            AddOutcome::Adopted
        }
    }
}

/// Make the best queued command current, or clear. Returns true if one was promoted.
fn promote(queue: &mut MovementQueue, entity: EntityHandle, locomotion: &mut dyn Locomotion) -> bool {
    if queue.queued.is_empty() {
        queue.current = None;
        return false;
    }
    let next = queue.queued.remove(0);
    queue.current = Some(next);
    forward(entity, &next, locomotion);
    true
}

/// Expire old commands and replace an invalid current one.
///
/// `is_valid` reports whether a command's tracked entity is still usable.
pub fn update(
    queue: &mut MovementQueue,
    entity: EntityHandle,
    now_ms: Millis,
    ttl_ms: Millis,
    is_valid: impl Fn(&MovementCommand) -> bool,
    locomotion: &mut dyn Locomotion,
) -> bool {
    let alive = |cmd: &MovementCommand| now_ms.saturating_sub(cmd.timestamp_ms) <= ttl_ms && is_valid(cmd);

    queue.queued.retain(|q| alive(q));
    match queue.current {
        Some(current) if !alive(&current) => promote(queue, entity, locomotion),
        None if !queue.queued.is_empty() => promote(queue, entity, locomotion),
        _ => false,
    }
}

/// Remove every command posted by `source`, promoting a replacement if needed.
pub fn withdraw_source(
    queue: &mut MovementQueue,
    entity: EntityHandle,
    source: CommandSource,
    locomotion: &mut dyn Locomotion,
) {
    queue.queued.retain(|q| q.source != source);
    if queue.current.is_some_and(|c| c.source == source) {
        promote(queue, entity, locomotion);
    }
}

/// Remove every command chasing `target`.
pub fn purge_target(
    queue: &mut MovementQueue,
    entity: EntityHandle,
    target: EntityHandle,
    locomotion: &mut dyn Locomotion,
) {
    let chases = |c: &MovementCommand| c.target.entity == Some(target);
    queue.queued.retain(|q| !chases(q));
    if queue.current.is_some_and(|c| chases(&c)) {
        promote(queue, entity, locomotion);
    }
}

/// Drop everything and hold position, bypassing arbitration.
pub fn emergency_stop(
    queue: &mut MovementQueue,
    entity: EntityHandle,
    position: Vec2,
    locomotion: &mut dyn Locomotion,
) {
    queue.queued.clear();
    queue.current = None;
    queue.halted = true;
    locomotion.set_mode(entity, MovementMode::MoveTo, Some(0.0));
    locomotion.set_target(entity, MoveTarget::at(position));
}
