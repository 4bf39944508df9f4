//! Stable handle -> arena entity mapping.

use std::collections::BTreeMap;

use hecs::Entity;
use starfray_core::types::EntityHandle;
use tracing::warn;

/// Result of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub handle: EntityHandle,
    /// The requested handle, when it collided with a live record.
    pub collided: Option<EntityHandle>,
}

#[derive(Debug, Default)]
pub struct Registry {
    by_handle: BTreeMap<EntityHandle, Entity>,
    next_handle: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an arena entity to a handle. A requested handle that is already
    /// live is never reused; the newer record gets a freshly minted one.
    pub fn register(&mut self, requested: Option<EntityHandle>, entity: Entity) -> Registration {
        let (handle, collided) = match requested {
            Some(h) if !self.by_handle.contains_key(&h) => (h, None),
            Some(h) => {
                let fresh = self.mint();
                warn!(requested = %h, assigned = %fresh, "handle collision, minted fresh handle");
                (fresh, Some(h))
            }
            None => (self.mint(), None),
        };
        self.next_handle = self.next_handle.max(handle.0.saturating_add(1));
        self.by_handle.insert(handle, entity);
        Registration { handle, collided }
    }

    fn mint(&mut self) -> EntityHandle {
        let mut candidate = EntityHandle(self.next_handle);
        while self.by_handle.contains_key(&candidate) {
            candidate = EntityHandle(candidate.0.saturating_add(1));
        }
        candidate
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<Entity> {
        self.by_handle.get(&handle).copied()
    }

    pub fn remove(&mut self, handle: EntityHandle) -> Option<Entity> {
        self.by_handle.remove(&handle)
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.by_handle.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}
