//! Per-key mutual exclusion.
//!
//! Lock order, when more than one is held: escrow, then engagement, then
//! request. No lock is held while sending notifications.
//!
//! Slots live only while someone holds or waits on them. The guard removes
//! its slot on drop when no other holder remains, so the map is bounded by
//! the number of keys in use rather than every key ever seen.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use uuid::Uuid;

/// A lazily populated map of per-key mutexes.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Exclusive access to one key. Unlocks and evicts the idle slot on drop.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: Uuid,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free and take it.
    pub fn lock(&self, key: Uuid) -> KeyGuard<'_> {
        // Clone under the shard lock so eviction cannot race the handout.
        let slot = Arc::clone(self.slots.entry(key).or_default().value());
        KeyGuard {
            locks: self,
            key,
            guard: Some(slot.lock_arc()),
        }
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with<R>(&self, key: Uuid, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock(key);
        f()
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex and our reference before checking for waiters.
        self.guard.take();
        self.locks
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

impl std::fmt::Debug for KeyGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.key).finish()
    }
}
