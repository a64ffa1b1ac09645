//! # Dispute Resolver
//!
//! The only path that may move a held escrow other than a normal release.
//! Every dispute operation serializes on the escrow lock, the same lock
//! release and refund take, so a resolution and a release can never race.
//! The engagement lock is taken inside it when the engagement moves.

use std::sync::Arc;

use serde_json::{json, Value};

use engage_adapters::NotificationEvent;
use engage_arbitration::{
    AdminDecision, ArbitrationError, Dispute, EscrowPayment, Resolution,
};
use engage_core::{messages, Actor, DisputeId, EscrowId, MarketError, Timestamp};
use engage_state::{Engagement, EngagementStatus};

use crate::context::{rejected, Context};
use crate::engagements::engagement_payload;
use crate::ledger::{escrow_payload, EscrowLedger};
use crate::outbox::Outbox;

/// Outcome of a resolved dispute.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DisputeOutcome {
    pub dispute: Dispute,
    pub escrow: EscrowPayment,
    pub engagement: Engagement,
}

/// Opens, reviews and resolves disputes.
#[derive(Debug, Clone)]
pub struct DisputeResolver {
    ctx: Arc<Context>,
    ledger: EscrowLedger,
}

impl DisputeResolver {
    pub(crate) fn new(ctx: Arc<Context>, ledger: EscrowLedger) -> Self {
        Self { ctx, ledger }
    }

    pub fn get(&self, dispute_id: DisputeId) -> Result<Dispute, MarketError> {
        self.ctx
            .repos
            .disputes
            .get(&dispute_id)
            .ok_or_else(|| MarketError::not_found(messages::DISPUTE_NOT_FOUND))
    }

    /// Disputes raised against an escrow, oldest first.
    pub fn for_escrow(&self, escrow_id: EscrowId) -> Vec<Dispute> {
        let mut disputes = self
            .ctx
            .repos
            .disputes
            .filter(|d| d.escrow_id == escrow_id);
        disputes.sort_by_key(|d| d.created_at);
        disputes
    }

    /// Freeze a held escrow under a new dispute.
    ///
    /// The raising side is the actor's side; only parties to the
    /// engagement may raise one. An active engagement moves to disputed.
    pub fn create_dispute(
        &self,
        escrow_id: EscrowId,
        reason: impl Into<String>,
        evidence: Vec<(String, Value)>,
        actor: Actor,
    ) -> Result<Dispute, MarketError> {
        let reason = reason.into();
        let mut outbox = Outbox::new();
        let result = self.create_inner(escrow_id, reason, evidence, actor, &mut outbox);
        outbox.flush(self.ctx.collab.notifier.as_ref());
        result.map_err(|e| rejected("dispute.create", e))
    }

    fn create_inner(
        &self,
        escrow_id: EscrowId,
        reason: String,
        evidence: Vec<(String, Value)>,
        actor: Actor,
        outbox: &mut Outbox,
    ) -> Result<Dispute, MarketError> {
        if reason.trim().is_empty() {
            return Err(MarketError::validation("Dispute reason must not be empty"));
        }
        let repos = &self.ctx.repos;
        if !repos.escrows.contains(&escrow_id) {
            return Err(MarketError::not_found(messages::ESCROW_NOT_FOUND));
        }
        let _escrow_guard = self.ctx.escrow_locks.lock(*escrow_id.as_uuid());

        let escrow = self.ledger.get(escrow_id)?;
        let engagement = repos
            .engagements
            .get(&escrow.engagement_id)
            .ok_or_else(|| MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND))?;
        let now = Timestamp::now();
        let dispute = Dispute::open(&escrow, &engagement, &actor, reason.clone(), evidence, now)?;

        let (escrow, escrow_before) = repos
            .escrows
            .try_update(&escrow_id, |e| {
                let before = e.transitions.len();
                e.open_dispute(actor, now)?;
                Ok::<_, MarketError>((e.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ESCROW_NOT_FOUND)))?;
        self.ctx
            .journal
            .record_since(*escrow.id.as_uuid(), &escrow.transitions, escrow_before);

        self.move_engagement(
            &engagement,
            EngagementStatus::Active,
            EngagementStatus::Disputed,
            actor,
            Some(reason),
        )?;
        repos.disputes.insert(dispute.id, dispute.clone());

        tracing::info!(
            dispute_id = %dispute.id,
            escrow_id = %escrow_id,
            raised_by = %dispute.raised_by,
            evidence = dispute.evidence.len(),
            "dispute opened"
        );
        outbox.push_all(
            NotificationEvent::DisputeOpened,
            &[dispute.seeker_id, dispute.provider_id],
            dispute_payload(&dispute),
        );
        Ok(dispute)
    }

    /// OPEN → UNDER_REVIEW.
    pub fn begin_review(&self, dispute_id: DisputeId, actor: Actor) -> Result<Dispute, MarketError> {
        self.update(dispute_id, "dispute.begin_review", |d, now| {
            d.begin_review(actor, now)
        })
    }

    /// UNDER_REVIEW → ADMIN_REVIEW.
    pub fn escalate(
        &self,
        dispute_id: DisputeId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Dispute, MarketError> {
        self.update(dispute_id, "dispute.escalate", |d, now| {
            d.escalate(actor, reason, now)
        })
    }

    /// Append a party's evidence to an unresolved dispute.
    pub fn add_evidence(
        &self,
        dispute_id: DisputeId,
        actor: Actor,
        description: impl Into<String>,
        payload: Value,
    ) -> Result<Dispute, MarketError> {
        let description = description.into();
        self.update(dispute_id, "dispute.add_evidence", |d, now| {
            d.add_evidence(&actor, description, payload, now)
        })
    }

    fn update(
        &self,
        dispute_id: DisputeId,
        operation: &'static str,
        f: impl FnOnce(&mut Dispute, Timestamp) -> Result<(), ArbitrationError>,
    ) -> Result<Dispute, MarketError> {
        let escrow_id = self.get(dispute_id)?.escrow_id;
        let guard = self.ctx.escrow_locks.lock(*escrow_id.as_uuid());
        let (dispute, before) = self
            .ctx
            .repos
            .disputes
            .try_update(&dispute_id, |d| {
                let before = d.transitions.len();
                f(d, Timestamp::now())?;
                Ok::<_, MarketError>((d.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::DISPUTE_NOT_FOUND)))
            .map_err(|e| rejected(operation, e))?;
        drop(guard);

        self.ctx
            .journal
            .record_since(*dispute.id.as_uuid(), &dispute.transitions, before);
        tracing::info!(
            dispute_id = %dispute.id,
            status = %dispute.status,
            operation,
            "dispute updated"
        );
        Ok(dispute)
    }

    /// Apply an admin's binding decision.
    ///
    /// `release` pays the provider and returns the engagement to active.
    /// `refund_full` and `refund_partial` refund the seeker, pay any
    /// remainder to the provider, and terminate the engagement. The escrow
    /// moves before the dispute is marked resolved, so a failed payment
    /// leaves the dispute open for a retry.
    pub fn resolve(
        &self,
        dispute_id: DisputeId,
        decision: AdminDecision,
        admin: Actor,
    ) -> Result<DisputeOutcome, MarketError> {
        let mut outbox = Outbox::new();
        let result = self.resolve_inner(dispute_id, decision, admin, &mut outbox);
        outbox.flush(self.ctx.collab.notifier.as_ref());
        result.map_err(|e| rejected("dispute.resolve", e))
    }

    fn resolve_inner(
        &self,
        dispute_id: DisputeId,
        decision: AdminDecision,
        admin: Actor,
        outbox: &mut Outbox,
    ) -> Result<DisputeOutcome, MarketError> {
        let repos = &self.ctx.repos;
        let escrow_id = self.get(dispute_id)?.escrow_id;
        let _guard = self.ctx.escrow_locks.lock(*escrow_id.as_uuid());

        let dispute = self.get(dispute_id)?;
        let escrow = self.ledger.get(escrow_id)?;
        let refund_amount = dispute.check_decision(&decision, &admin, &escrow)?;

        let engagement = repos
            .engagements
            .get(&dispute.engagement_id)
            .ok_or_else(|| MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND))?;
        let note = Some(format!(
            "dispute {} resolved: {}",
            dispute.id,
            decision.resolution.as_str()
        ));

        let (escrow, engagement_target, event) = match decision.resolution {
            Resolution::Release => {
                let check = escrow.check_release_after_dispute()?;
                (
                    self.ledger.apply_release(&escrow, check, admin)?,
                    EngagementStatus::Active,
                    NotificationEvent::EscrowReleased,
                )
            }
            Resolution::RefundFull | Resolution::RefundPartial => (
                self.ledger
                    .apply_refund(&escrow, refund_amount, admin, note.clone())?,
                EngagementStatus::Terminated,
                NotificationEvent::EscrowRefunded,
            ),
        };

        let engagement = self.move_engagement(
            &engagement,
            EngagementStatus::Disputed,
            engagement_target,
            admin,
            note,
        )?;

        let (dispute, before) = repos
            .disputes
            .try_update(&dispute_id, |d| {
                let before = d.transitions.len();
                d.mark_resolved(&decision, refund_amount, admin, Timestamp::now())?;
                Ok::<_, MarketError>((d.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::DISPUTE_NOT_FOUND)))?;
        self.ctx
            .journal
            .record_since(*dispute.id.as_uuid(), &dispute.transitions, before);

        tracing::info!(
            dispute_id = %dispute.id,
            resolution = decision.resolution.as_str(),
            refunded = refund_amount,
            escrow_status = %escrow.status,
            engagement_status = %engagement.status,
            "dispute resolved"
        );
        let parties = [dispute.seeker_id, dispute.provider_id];
        outbox.push_all(NotificationEvent::DisputeResolved, &parties, dispute_payload(&dispute));
        outbox.push_all(event, &parties, escrow_payload(&escrow));
        outbox.push_all(
            NotificationEvent::EngagementStatusChanged,
            &parties,
            engagement_payload(&engagement),
        );

        Ok(DisputeOutcome {
            dispute,
            escrow,
            engagement,
        })
    }

    /// Move the engagement `from → to` if it is currently `from`.
    ///
    /// Returns the engagement as stored afterwards.
    fn move_engagement(
        &self,
        engagement: &Engagement,
        from: EngagementStatus,
        to: EngagementStatus,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Engagement, MarketError> {
        let _guard = self.ctx.engagement_locks.lock(*engagement.id.as_uuid());
        let moved = self
            .ctx
            .repos
            .engagements
            .try_update(&engagement.id, |e| {
                if e.status != from {
                    return Ok::<_, MarketError>(None);
                }
                let before = e.transitions.len();
                e.transition(to, actor, reason, Timestamp::now())?;
                Ok(Some((e.clone(), before)))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND)))?;

        match moved {
            Some((moved, before)) => {
                self.ctx
                    .journal
                    .record_since(*moved.id.as_uuid(), &moved.transitions, before);
                tracing::info!(
                    engagement_id = %moved.id,
                    from = %from,
                    to = %to,
                    "engagement transition"
                );
                Ok(moved)
            }
            None => self
                .ctx
                .repos
                .engagements
                .get(&engagement.id)
                .ok_or_else(|| MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND)),
        }
    }
}

fn dispute_payload(dispute: &Dispute) -> Value {
    json!({
        "dispute_id": dispute.id.to_string(),
        "escrow_id": dispute.escrow_id.to_string(),
        "status": dispute.status.as_str(),
        "raised_by": dispute.raised_by.as_str(),
        "resolution": dispute.resolution.map(|r| r.as_str()),
        "resolved_amount": dispute.resolved_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::Harness;
    use engage_adapters::{PaymentOp, ProcessorError};
    use engage_arbitration::{DisputeStatus, EscrowStatus, EvidenceSource};
    use engage_core::{ActorId, ErrorKind};

    fn decision(resolution: Resolution, amount: Option<i64>) -> AdminDecision {
        AdminDecision {
            resolution,
            amount,
            notes: None,
        }
    }

    #[test]
    fn opening_freezes_escrow_and_disputes_engagement() {
        let h = Harness::new();
        let (engagement, escrow) = h.active_engagement(10_000);
        let dispute = h
            .market
            .disputes()
            .create_dispute(
                escrow.id,
                "work not delivered",
                vec![("screenshot".into(), json!({"url": "s3://x"}))],
                Actor::seeker(engagement.seeker_id),
            )
            .unwrap();
        assert_eq!(dispute.status, DisputeStatus::Open);
        assert_eq!(dispute.evidence.len(), 2);
        assert_eq!(dispute.evidence.items()[0].submitted_by, EvidenceSource::System);

        assert_eq!(h.market.ledger().get(escrow.id).unwrap().status, EscrowStatus::Disputed);
        assert_eq!(
            h.market.engagements().get(engagement.id).unwrap().status,
            EngagementStatus::Disputed
        );
        assert_eq!(h.notifier.sent_of(NotificationEvent::DisputeOpened).len(), 2);
    }

    #[test]
    fn no_dispute_on_a_non_held_escrow() {
        let h = Harness::new();
        let (engagement, escrow) = h.active_engagement(10_000);
        let seeker = Actor::seeker(engagement.seeker_id);
        h.market
            .disputes()
            .create_dispute(escrow.id, "first", vec![], seeker)
            .unwrap();
        let err = h
            .market
            .disputes()
            .create_dispute(escrow.id, "second", vec![], seeker)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(h.market.disputes().for_escrow(escrow.id).len(), 1);
    }

    #[test]
    fn outsiders_and_admins_cannot_raise_disputes() {
        let h = Harness::new();
        let (_, escrow) = h.active_engagement(10_000);
        for actor in [Actor::seeker(ActorId::new()), Actor::admin(ActorId::new())] {
            let err = h
                .market
                .disputes()
                .create_dispute(escrow.id, "x", vec![], actor)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Permission);
        }
        assert_eq!(h.market.ledger().get(escrow.id).unwrap().status, EscrowStatus::Held);
    }

    #[test]
    fn open_dispute_blocks_normal_release() {
        let h = Harness::new();
        let (engagement, escrow) = h.completed_engagement(10_000);
        h.market
            .disputes()
            .create_dispute(escrow.id, "quality", vec![], Actor::provider(engagement.provider_id))
            .unwrap();
        let err = h
            .market
            .ledger()
            .release(escrow.id, Actor::system())
            .unwrap_err();
        assert_eq!(err.message(), messages::ESCROW_OPEN_DISPUTE);
        // Completed engagements stay completed when disputed.
        assert_eq!(
            h.market.engagements().get(engagement.id).unwrap().status,
            EngagementStatus::Completed
        );
    }

    #[test]
    fn resolve_release_pays_provider_and_reactivates() {
        let h = Harness::new();
        let (dispute, engagement) = h.reviewed_dispute(10_000);
        let admin = Actor::admin(ActorId::new());
        let outcome = h
            .market
            .disputes()
            .resolve(dispute.id, decision(Resolution::Release, None), admin)
            .unwrap();
        assert_eq!(outcome.escrow.status, EscrowStatus::Released);
        assert_eq!(outcome.engagement.status, EngagementStatus::Active);
        assert_eq!(outcome.dispute.resolved_amount, Some(0));
        assert_eq!(outcome.dispute.resolved_by, Some(admin.id));
        assert_eq!(h.processor.executed(PaymentOp::Transfer), 1);
        assert_eq!(engagement.id, outcome.engagement.id);
    }

    #[test]
    fn resolve_refund_full_terminates() {
        let h = Harness::new();
        let (dispute, _) = h.reviewed_dispute(10_000);
        let outcome = h
            .market
            .disputes()
            .resolve(
                dispute.id,
                decision(Resolution::RefundFull, None),
                Actor::admin(ActorId::new()),
            )
            .unwrap();
        assert_eq!(outcome.escrow.status, EscrowStatus::Refunded);
        assert_eq!(outcome.escrow.refunded_amount, 10_000);
        assert_eq!(outcome.escrow.payout, None);
        assert_eq!(outcome.engagement.status, EngagementStatus::Terminated);
        assert_eq!(h.processor.executed(PaymentOp::Transfer), 0);
    }

    #[test]
    fn resolve_is_admin_only_and_validates_partial_amounts() {
        let h = Harness::new();
        let (dispute, engagement) = h.reviewed_dispute(10_000);
        let resolver = h.market.disputes();

        let err = resolver
            .resolve(
                dispute.id,
                decision(Resolution::Release, None),
                Actor::seeker(engagement.seeker_id),
            )
            .unwrap_err();
        assert_eq!(err.message(), messages::DISPUTE_ADMIN_ONLY);

        let admin = Actor::admin(ActorId::new());
        for amount in [None, Some(0), Some(10_000), Some(12_000)] {
            let err = resolver
                .resolve(dispute.id, decision(Resolution::RefundPartial, amount), admin)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{amount:?}");
        }
        assert!(h.processor.calls().iter().all(|c| c.op == PaymentOp::Capture));
    }

    #[test]
    fn failed_refund_leaves_dispute_open_and_retry_is_safe() {
        let h = Harness::new();
        let (dispute, _) = h.reviewed_dispute(10_000);
        let admin = Actor::admin(ActorId::new());
        let partial = decision(Resolution::RefundPartial, Some(4_000));

        h.processor.fail_next(ProcessorError::Rejected {
            reason: "insufficient platform balance".into(),
        });
        let err = h
            .market
            .disputes()
            .resolve(dispute.id, partial.clone(), admin)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentFailed);
        assert!(h.market.disputes().get(dispute.id).unwrap().is_open());
        assert_eq!(
            h.market.ledger().get(dispute.escrow_id).unwrap().status,
            EscrowStatus::Disputed
        );

        let outcome = h.market.disputes().resolve(dispute.id, partial, admin).unwrap();
        assert_eq!(outcome.escrow.refunded_amount, 4_000);
        let payout = outcome.escrow.payout.unwrap();
        assert_eq!((payout.platform_fee, payout.provider_amount), (900, 5_100));
        assert_eq!(outcome.engagement.status, EngagementStatus::Terminated);
        assert_eq!(h.processor.executed(PaymentOp::Transfer), 1);
    }

    #[test]
    fn resolution_requires_review_first() {
        let h = Harness::new();
        let (engagement, escrow) = h.active_engagement(10_000);
        let dispute = h
            .market
            .disputes()
            .create_dispute(escrow.id, "late", vec![], Actor::seeker(engagement.seeker_id))
            .unwrap();
        let err = h
            .market
            .disputes()
            .resolve(
                dispute.id,
                decision(Resolution::RefundFull, None),
                Actor::admin(ActorId::new()),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn evidence_and_escalation() {
        let h = Harness::new();
        let (dispute, engagement) = h.reviewed_dispute(10_000);
        let provider = Actor::provider(engagement.provider_id);
        let resolver = h.market.disputes();

        let updated = resolver
            .add_evidence(dispute.id, provider, "commit log", json!(["abc123"]))
            .unwrap();
        assert_eq!(updated.evidence.from_source(EvidenceSource::Provider).count(), 1);

        let err = resolver
            .add_evidence(dispute.id, Actor::admin(ActorId::new()), "note", Value::Null)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);

        let escalated = resolver
            .escalate(dispute.id, provider, Some("needs a human".into()))
            .unwrap();
        assert_eq!(escalated.status, DisputeStatus::AdminReview);

        let err = resolver.begin_review(DisputeId::new(), provider).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
