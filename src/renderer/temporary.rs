//! Frame-scoped arena for temporary targets, shared by every backend.

use std::collections::hash_map::Entry as MapEntry;

use rustc_hash::FxHashMap;

use super::target::{TargetDescriptor, TargetId};

struct Entry<T> {
    descriptor: TargetDescriptor,
    resource: T,
}

/// Temporary targets alive this frame, keyed by [`TargetId`].
///
/// Backends allocate through [`acquire`](Self::acquire) and free through
/// [`release`](Self::release); anything left at end of frame shows up in
/// [`live_ids`](Self::live_ids).
pub struct TemporaryTargets<T> {
    live: FxHashMap<TargetId, Entry<T>>,
    allocations: u64,
    releases: u64,
}

impl<T> Default for TemporaryTargets<T> {
    fn default() -> Self {
        Self {
            live: FxHashMap::default(),
            allocations: 0,
            releases: 0,
        }
    }
}

impl<T> TemporaryTargets<T> {
    /// Empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the target under `id`, allocating it with `allocate` when it
    /// is missing or was allocated with a different descriptor.
    ///
    /// # Errors
    ///
    /// Propagates the allocator's error; the arena is left without an entry
    /// for `id` in that case, releasing any stale one.
    pub fn acquire<E>(
        &mut self,
        id: TargetId,
        descriptor: TargetDescriptor,
        allocate: impl FnOnce(&TargetDescriptor) -> Result<T, E>,
    ) -> Result<&mut T, E> {
        match self.live.entry(id) {
            MapEntry::Occupied(mut slot) => {
                if slot.get().descriptor != descriptor {
                    match allocate(&descriptor) {
                        Ok(resource) => {
                            let _ = slot.insert(Entry {
                                descriptor,
                                resource,
                            });
                            self.allocations += 1;
                            self.releases += 1;
                        }
                        Err(e) => {
                            let _ = slot.remove();
                            self.releases += 1;
                            return Err(e);
                        }
                    }
                }
                Ok(&mut slot.into_mut().resource)
            }
            MapEntry::Vacant(slot) => {
                let resource = allocate(&descriptor)?;
                self.allocations += 1;
                Ok(&mut slot
                    .insert(Entry {
                        descriptor,
                        resource,
                    })
                    .resource)
            }
        }
    }

    /// Target under `id`.
    #[must_use]
    pub fn get(&self, id: TargetId) -> Option<&T> {
        self.live.get(&id).map(|entry| &entry.resource)
    }

    /// Mutable target under `id`.
    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut T> {
        self.live.get_mut(&id).map(|entry| &mut entry.resource)
    }

    /// Descriptor `id` was allocated with.
    #[must_use]
    pub fn descriptor(&self, id: TargetId) -> Option<&TargetDescriptor> {
        self.live.get(&id).map(|entry| &entry.descriptor)
    }

    /// Remove and return the target under `id`.
    pub fn release(&mut self, id: TargetId) -> Option<T> {
        let entry = self.live.remove(&id)?;
        self.releases += 1;
        Some(entry.resource)
    }

    /// Ids still alive, sorted.
    #[must_use]
    pub fn live_ids(&self) -> Vec<TargetId> {
        let mut ids: Vec<_> = self.live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Bytes held by live targets.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.live
            .values()
            .map(|entry| entry.descriptor.byte_size())
            .sum()
    }

    /// Number of live targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no target is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Total allocations since creation.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Total releases since creation, including reallocations.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.releases
    }
}
