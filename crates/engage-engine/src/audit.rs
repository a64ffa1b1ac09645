//! # Audit Journal
//!
//! Cross-entity, append-only log of every accepted status transition. Each
//! entity also keeps its own history; the journal mirrors those records as
//! type-erased [`AuditEntry`] values so one query can reconstruct what
//! happened to a request, its offers, the engagement, the escrow and any
//! dispute, in order.
//!
//! Entries are never trimmed or rewritten.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use engage_core::{AuditEntry, EntityKind, Lifecycle, TransitionRecord};

/// Shared append-only journal.
#[derive(Debug, Clone, Default)]
pub struct AuditJournal {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl AuditJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror transition records of one entity into the journal.
    pub fn record<S: Lifecycle>(&self, entity_id: Uuid, records: &[TransitionRecord<S>]) {
        if records.is_empty() {
            return;
        }
        let mut entries = self.entries.write();
        entries.extend(records.iter().map(|r| r.to_audit(entity_id)));
    }

    /// Mirror the records appended since the history had `before` entries.
    pub fn record_since<S: Lifecycle>(
        &self,
        entity_id: Uuid,
        history: &[TransitionRecord<S>],
        before: usize,
    ) {
        self.record(entity_id, history.get(before..).unwrap_or_default());
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    /// Entries for one entity, oldest first.
    pub fn for_entity(&self, entity_id: Uuid) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }

    /// Entries for one kind of entity, oldest first.
    pub fn of_kind(&self, kind: EntityKind) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.entity == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
