//! # Lifecycle Transitions
//!
//! Every entity status enum implements [`Lifecycle`]. Its
//! `valid_transitions()` is the one transition table for that entity; the
//! state machines in `engage-state` and `engage-arbitration` consult it
//! before any mutation and never compare status strings.
//!
//! Each accepted transition produces a [`TransitionRecord`] that is appended
//! to the entity's history and mirrored as an [`AuditEntry`] into the
//! cross-entity audit journal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::temporal::Timestamp;

/// The kinds of entity that carry a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TalentRequest,
    Offer,
    Engagement,
    EscrowPayment,
    Dispute,
}

impl EntityKind {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TalentRequest => "talent_request",
            Self::Offer => "offer",
            Self::Engagement => "engagement",
            Self::EscrowPayment => "escrow_payment",
            Self::Dispute => "dispute",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status enum with a single, static transition table.
pub trait Lifecycle:
    Copy + Eq + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    /// The entity this lifecycle belongs to.
    const ENTITY: EntityKind;

    /// Valid target states from this state.
    fn valid_transitions(&self) -> &'static [Self];

    /// Whether no further transitions are allowed.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether `next` is a legal successor of this state.
    fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Record of one accepted status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// Status before the transition.
    pub from: S,
    /// Status after the transition.
    pub to: S,
    /// Who triggered it.
    pub actor: Actor,
    /// When it happened.
    pub at: Timestamp,
    /// Optional free-text reason.
    pub reason: Option<String>,
}

impl<S: Lifecycle> TransitionRecord<S> {
    /// Record a transition happening now.
    pub fn now(from: S, to: S, actor: Actor, reason: Option<String>) -> Self {
        Self {
            from,
            to,
            actor,
            at: Timestamp::now(),
            reason,
        }
    }

    /// Type-erased copy for the audit journal.
    pub fn to_audit(&self, entity_id: Uuid) -> AuditEntry {
        AuditEntry {
            entity: S::ENTITY,
            entity_id,
            from: self.from.to_string(),
            to: self.to.to_string(),
            actor: self.actor,
            at: self.at,
            reason: self.reason.clone(),
        }
    }
}

/// A transition of any entity, as stored in the audit journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub from: String,
    pub to: String,
    pub actor: Actor,
    pub at: Timestamp,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    impl std::fmt::Display for Light {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Lifecycle for Light {
        const ENTITY: EntityKind = EntityKind::Offer;

        fn valid_transitions(&self) -> &'static [Self] {
            match self {
                Self::Red => &[Self::Green, Self::Off],
                Self::Green => &[Self::Red],
                Self::Off => &[],
            }
        }
    }

    #[test]
    fn table_drives_legality() {
        assert!(Light::Red.can_transition_to(Light::Green));
        assert!(!Light::Green.can_transition_to(Light::Off));
        assert!(Light::Off.is_terminal());
        assert!(!Light::Red.is_terminal());
    }

    #[test]
    fn audit_entry_carries_entity_and_names() {
        let record = TransitionRecord::now(Light::Red, Light::Green, Actor::system(), None);
        let id = Uuid::new_v4();
        let entry = record.to_audit(id);
        assert_eq!(entry.entity, EntityKind::Offer);
        assert_eq!(entry.entity_id, id);
        assert_eq!(entry.from, "Red");
        assert_eq!(entry.to, "Green");
    }
}
