//! Evidence attached to a dispute.
//!
//! Items are append-only. Parties submit free-form JSON; the resolver also
//! attaches the engagement's transition history when the dispute opens.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use engage_core::{Side, Timestamp, TransitionRecord};
use engage_state::EngagementStatus;

/// Who supplied an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Seeker,
    Provider,
    /// Attached by the platform itself.
    System,
}

impl From<Side> for EvidenceSource {
    fn from(side: Side) -> Self {
        match side {
            Side::Seeker => Self::Seeker,
            Side::Provider => Self::Provider,
        }
    }
}

/// A single piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub submitted_by: EvidenceSource,
    pub description: String,
    pub payload: Value,
    pub submitted_at: Timestamp,
}

impl EvidenceItem {
    pub fn new(
        submitted_by: EvidenceSource,
        description: impl Into<String>,
        payload: Value,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            submitted_by,
            description: description.into(),
            payload,
            submitted_at,
        }
    }

    /// The engagement's transition history as a system evidence item.
    pub fn engagement_history(
        history: &[TransitionRecord<EngagementStatus>],
        now: Timestamp,
    ) -> Self {
        let entries: Vec<Value> = history
            .iter()
            .map(|t| {
                json!({
                    "from": t.from.as_str(),
                    "to": t.to.as_str(),
                    "actor": t.actor.to_string(),
                    "at": t.at.to_iso8601(),
                    "reason": t.reason,
                })
            })
            .collect();
        Self::new(
            EvidenceSource::System,
            "Engagement transition history",
            Value::Array(entries),
            now,
        )
    }
}

/// Ordered, append-only collection of evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceBag(Vec<EvidenceItem>);

impl EvidenceBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: EvidenceItem) {
        self.0.push(item);
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Items supplied by one source.
    pub fn from_source(&self, source: EvidenceSource) -> impl Iterator<Item = &EvidenceItem> {
        self.0.iter().filter(move |i| i.submitted_by == source)
    }
}

impl FromIterator<EvidenceItem> for EvidenceBag {
    fn from_iter<I: IntoIterator<Item = EvidenceItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
