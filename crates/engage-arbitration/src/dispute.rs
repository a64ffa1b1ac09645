//! # Dispute Lifecycle
//!
//! `Open → UnderReview → (AdminReview →) Resolved`.
//!
//! A dispute freezes its escrow from the moment it opens. Parties may add
//! evidence until it resolves; only an admin may resolve it, by submitting
//! an [`AdminDecision`]. The decision is validated here and applied to the
//! escrow and engagement by the engine in one critical section.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use engage_core::{
    Actor, ActorId, DisputeId, EngagementId, EntityKind, EscrowId, Lifecycle, Side, Timestamp,
    TransitionRecord,
};
use engage_state::Engagement;

use crate::error::ArbitrationError;
use crate::escrow::EscrowPayment;
use crate::evidence::{EvidenceBag, EvidenceItem};

/// Dispute status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    /// Escalated for an administrator's decision.
    AdminReview,
    /// Terminal state.
    Resolved,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::AdminReview => "admin_review",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for DisputeStatus {
    const ENTITY: EntityKind = EntityKind::Dispute;

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::UnderReview],
            Self::UnderReview => &[Self::AdminReview, Self::Resolved],
            Self::AdminReview => &[Self::Resolved],
            Self::Resolved => &[],
        }
    }
}

/// Binding outcome of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Return the whole escrow to the seeker.
    RefundFull,
    /// Return part to the seeker, pay the remainder to the provider.
    RefundPartial,
    /// Pay the provider as if the engagement completed normally.
    Release,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefundFull => "refund_full",
            Self::RefundPartial => "refund_partial",
            Self::Release => "release",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An administrator's ruling on a dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDecision {
    pub resolution: Resolution,
    /// Refund amount; required for `refund_partial`, ignored otherwise.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A dispute over one escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub escrow_id: EscrowId,
    pub engagement_id: EngagementId,
    pub seeker_id: ActorId,
    pub provider_id: ActorId,
    pub raised_by: Side,
    pub reason: String,
    pub evidence: EvidenceBag,
    pub status: DisputeStatus,
    pub resolution: Option<Resolution>,
    /// Amount refunded to the seeker (zero for `release`).
    pub resolved_amount: Option<i64>,
    pub resolved_by: Option<ActorId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub transitions: Vec<TransitionRecord<DisputeStatus>>,
}

impl Dispute {
    /// Open a dispute raised by a party to the engagement.
    ///
    /// The escrow must be held. The engagement's transition history is
    /// attached as the first evidence item.
    pub fn open(
        escrow: &EscrowPayment,
        engagement: &Engagement,
        actor: &Actor,
        reason: impl Into<String>,
        evidence: Vec<(String, Value)>,
        now: Timestamp,
    ) -> Result<Self, ArbitrationError> {
        let id = DisputeId::new();
        let raised_by = engagement
            .side_of(actor)
            .ok_or_else(|| ArbitrationError::NotAParty {
                dispute_id: id.to_string(),
                actor: actor.to_string(),
            })?;
        if escrow.status != crate::escrow::EscrowStatus::Held {
            return Err(ArbitrationError::InvalidEscrowOperation {
                escrow_id: escrow.id.to_string(),
                operation: "dispute".to_string(),
                status: escrow.status.to_string(),
            });
        }

        let mut bag = EvidenceBag::new();
        bag.push(EvidenceItem::engagement_history(&engagement.transitions, now));
        for (description, payload) in evidence {
            bag.push(EvidenceItem::new(raised_by.into(), description, payload, now));
        }

        Ok(Self {
            id,
            escrow_id: escrow.id,
            engagement_id: engagement.id,
            seeker_id: engagement.seeker_id,
            provider_id: engagement.provider_id,
            raised_by,
            reason: reason.into(),
            evidence: bag,
            status: DisputeStatus::Open,
            resolution: None,
            resolved_amount: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            transitions: Vec::new(),
        })
    }

    /// Whether the dispute still freezes its escrow.
    pub fn is_open(&self) -> bool {
        self.status != DisputeStatus::Resolved
    }

    fn party_side(&self, actor: &Actor) -> Option<Side> {
        actor.side().filter(|s| {
            let id = match s {
                Side::Seeker => self.seeker_id,
                Side::Provider => self.provider_id,
            };
            actor.is_party(*s, id)
        })
    }

    fn require_party_or_admin(&self, actor: &Actor) -> Result<(), ArbitrationError> {
        if actor.is_admin() || self.party_side(actor).is_some() {
            Ok(())
        } else {
            Err(self.not_a_party(actor))
        }
    }

    fn not_a_party(&self, actor: &Actor) -> ArbitrationError {
        ArbitrationError::NotAParty {
            dispute_id: self.id.to_string(),
            actor: actor.to_string(),
        }
    }

    fn require_unresolved(&self) -> Result<(), ArbitrationError> {
        if self.status == DisputeStatus::Resolved {
            return Err(ArbitrationError::DisputeAlreadyResolved {
                dispute_id: self.id.to_string(),
            });
        }
        Ok(())
    }

    /// OPEN → UNDER_REVIEW.
    pub fn begin_review(&mut self, actor: Actor, now: Timestamp) -> Result<(), ArbitrationError> {
        self.require_party_or_admin(&actor)?;
        self.require_unresolved()?;
        self.transition(DisputeStatus::UnderReview, actor, None, now)
    }

    /// UNDER_REVIEW → ADMIN_REVIEW.
    pub fn escalate(
        &mut self,
        actor: Actor,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), ArbitrationError> {
        self.require_party_or_admin(&actor)?;
        self.require_unresolved()?;
        self.transition(DisputeStatus::AdminReview, actor, reason, now)
    }

    /// Append a party's evidence while the dispute is unresolved.
    pub fn add_evidence(
        &mut self,
        actor: &Actor,
        description: impl Into<String>,
        payload: Value,
        now: Timestamp,
    ) -> Result<(), ArbitrationError> {
        let side = self.party_side(actor).ok_or_else(|| self.not_a_party(actor))?;
        self.require_unresolved()?;
        self.evidence
            .push(EvidenceItem::new(side.into(), description, payload, now));
        Ok(())
    }

    /// Validate an admin decision against the escrow it would move.
    ///
    /// Returns the amount to refund to the seeker: the whole escrow for
    /// `refund_full`, the decided amount for `refund_partial`, zero for
    /// `release`. Checks run admin first, then status, then amount.
    pub fn check_decision(
        &self,
        decision: &AdminDecision,
        actor: &Actor,
        escrow: &EscrowPayment,
    ) -> Result<i64, ArbitrationError> {
        if !actor.is_admin() {
            return Err(ArbitrationError::AdminOnly {
                actor: actor.to_string(),
            });
        }
        self.require_unresolved()?;
        if !self.status.can_transition_to(DisputeStatus::Resolved) {
            return Err(ArbitrationError::InvalidTransition {
                entity: EntityKind::Dispute,
                from: self.status.to_string(),
                to: DisputeStatus::Resolved.to_string(),
            });
        }
        match decision.resolution {
            Resolution::Release => Ok(0),
            Resolution::RefundFull => Ok(escrow.amount),
            Resolution::RefundPartial => match decision.amount {
                Some(a) if a > 0 && a < escrow.amount => Ok(a),
                other => Err(ArbitrationError::InvalidRefundAmount {
                    escrow_id: escrow.id.to_string(),
                    requested: other.unwrap_or(0),
                    held: escrow.amount,
                }),
            },
        }
    }

    /// Record a resolution that has already been applied to the escrow.
    pub fn mark_resolved(
        &mut self,
        decision: &AdminDecision,
        refunded: i64,
        admin: Actor,
        now: Timestamp,
    ) -> Result<(), ArbitrationError> {
        self.require_unresolved()?;
        self.transition(DisputeStatus::Resolved, admin, decision.notes.clone(), now)?;
        self.resolution = Some(decision.resolution);
        self.resolved_amount = Some(refunded);
        self.resolved_by = Some(admin.id);
        self.resolved_at = Some(now);
        Ok(())
    }

    fn transition(
        &mut self,
        to: DisputeStatus,
        actor: Actor,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), ArbitrationError> {
        if !self.status.can_transition_to(to) {
            return Err(ArbitrationError::InvalidTransition {
                entity: EntityKind::Dispute,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            actor,
            at: now,
            reason,
        });
        self.status = to;
        Ok(())
    }
}
