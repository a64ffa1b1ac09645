//! # Repositories
//!
//! [`Store`] is a thread-safe, cloneable in-memory map. All operations are
//! synchronous: the lock is `parking_lot` and is never held across a
//! collaborator call. [`Repositories`] bundles one store per entity and is
//! injected into the engine, so tests and servers each own their data.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use engage_arbitration::{Dispute, EscrowPayment};
use engage_core::{DisputeId, EngagementId, EscrowId, OfferId, ProfileId, RequestId};
use engage_matching::{TalentProfile, TalentRequest};
use engage_state::{Engagement, Offer};

/// Thread-safe, cloneable in-memory key-value store.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, T> Default for Store<K, T> {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, T> Store<K, T>
where
    K: Copy + Eq + Hash,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Records matching a predicate.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data.read().values().filter(|v| pred(v)).cloned().collect()
    }

    /// Whether any record matches a predicate.
    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.data.read().values().any(pred)
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under the write lock and may reject the update by
    /// returning `Err`. Returns `None` if the record doesn't exist.
    ///
    /// The closure works on a copy that replaces the stored value only on
    /// `Ok`, so a rejected update never leaves a partial mutation behind.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        let mut draft = entry.clone();
        let result = f(&mut draft);
        if result.is_ok() {
            *entry = draft;
        }
        Some(result)
    }

    /// Run `f` over the whole map under one write lock.
    ///
    /// Used where several records must change together.
    pub fn write_all<R>(&self, f: impl FnOnce(&mut HashMap<K, T>) -> R) -> R {
        f(&mut self.data.write())
    }

    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One store per persisted entity.
#[derive(Debug, Clone, Default)]
pub struct Repositories {
    pub requests: Store<RequestId, TalentRequest>,
    pub profiles: Store<ProfileId, TalentProfile>,
    pub offers: Store<OfferId, Offer>,
    pub engagements: Store<EngagementId, Engagement>,
    pub escrows: Store<EscrowId, EscrowPayment>,
    pub disputes: Store<DisputeId, Dispute>,
}

impl Repositories {
    pub fn new() -> Self {
        Self::default()
    }
}
