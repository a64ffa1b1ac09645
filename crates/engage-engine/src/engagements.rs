//! # Engagement Service
//!
//! Creation runs the contract gate and serializes on the request lock, so
//! an offer yields at most one engagement and a (request, profile) pair has
//! at most one open engagement. Every later transition serializes on the
//! engagement's own lock.

use std::sync::Arc;

use serde_json::json;

use engage_adapters::NotificationEvent;
use engage_core::{
    messages, Actor, EngagementId, Lifecycle, MarketError, OfferId, Timestamp,
};
use engage_state::{ensure_can_activate, Engagement, EngagementStatus, TransitionError};

use crate::context::{rejected, Context};
use crate::ledger::{escrow_payload, EscrowLedger};
use crate::outbox::Outbox;

/// Creates engagements and drives them through their lifecycle.
#[derive(Debug, Clone)]
pub struct EngagementService {
    ctx: Arc<Context>,
    ledger: EscrowLedger,
}

impl EngagementService {
    pub(crate) fn new(ctx: Arc<Context>, ledger: EscrowLedger) -> Self {
        Self { ctx, ledger }
    }

    pub fn get(&self, engagement_id: EngagementId) -> Result<Engagement, MarketError> {
        self.ctx
            .repos
            .engagements
            .get(&engagement_id)
            .ok_or_else(|| MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND))
    }

    /// Stage an engagement for an accepted, fully signed offer.
    pub fn create_engagement(
        &self,
        offer_id: OfferId,
        actor: Actor,
    ) -> Result<Engagement, MarketError> {
        let engagement = self
            .create_inner(offer_id, actor)
            .map_err(|e| rejected("engagement.create", e))?;
        let mut outbox = Outbox::new();
        outbox.push_all(
            NotificationEvent::EngagementCreated,
            &[engagement.seeker_id, engagement.provider_id],
            engagement_payload(&engagement),
        );
        outbox.flush(self.ctx.collab.notifier.as_ref());
        Ok(engagement)
    }

    fn create_inner(&self, offer_id: OfferId, actor: Actor) -> Result<Engagement, MarketError> {
        let repos = &self.ctx.repos;
        let offer = repos
            .offers
            .get(&offer_id)
            .ok_or_else(|| MarketError::not_found(messages::OFFER_NOT_FOUND))?;
        let party = actor
            .side()
            .is_some_and(|s| actor.is_party(s, offer.party(s)));
        if !party && !actor.is_admin() {
            return Err(MarketError::permission(messages::ENGAGEMENT_NOT_A_PARTY));
        }

        let signature = match self.ctx.collab.contracts.is_fully_signed(offer_id) {
            Ok(signed) => Some(signed),
            Err(e) => {
                tracing::warn!(offer_id = %offer_id, error = %e, "contract lookup failed");
                None
            }
        };
        ensure_can_activate(&offer, signature)?;

        let _guard = self.ctx.request_locks.lock(*offer.request_id.as_uuid());

        if repos.engagements.any(|e| e.offer_id == offer_id) {
            return Err(MarketError::conflict(messages::ENGAGEMENT_EXISTS_FOR_OFFER));
        }
        if repos.engagements.any(|e| {
            e.request_id == offer.request_id && e.profile_id == offer.profile_id && e.is_open()
        }) {
            return Err(MarketError::conflict(messages::ENGAGEMENT_ALREADY_OPEN));
        }

        let engagement = Engagement::from_offer(&offer, Timestamp::now());
        repos.engagements.insert(engagement.id, engagement.clone());
        tracing::info!(
            engagement_id = %engagement.id,
            offer_id = %offer_id,
            total_amount = engagement.total_amount.amount,
            "engagement staged"
        );
        Ok(engagement)
    }

    /// Move an engagement along its lifecycle.
    ///
    /// Activation goes through [`activate`](Self::activate) and disputes
    /// through the dispute resolver; neither is reachable here. While a
    /// dispute is open the engagement cannot be moved at all.
    pub fn transition(
        &self,
        engagement_id: EngagementId,
        to: EngagementStatus,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Engagement, MarketError> {
        let engagement = self
            .transition_inner(engagement_id, to, actor, reason)
            .map_err(|e| rejected("engagement.transition", e))?;
        let mut outbox = Outbox::new();
        outbox.push_all(
            NotificationEvent::EngagementStatusChanged,
            &[engagement.seeker_id, engagement.provider_id],
            engagement_payload(&engagement),
        );
        outbox.flush(self.ctx.collab.notifier.as_ref());
        Ok(engagement)
    }

    fn transition_inner(
        &self,
        engagement_id: EngagementId,
        to: EngagementStatus,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Engagement, MarketError> {
        if matches!(to, EngagementStatus::Active | EngagementStatus::Disputed) {
            return Err(MarketError::invalid_state(format!(
                "Engagement cannot be moved to {to} directly"
            )));
        }
        if !self.ctx.repos.engagements.contains(&engagement_id) {
            return Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND));
        }
        let _guard = self.ctx.engagement_locks.lock(*engagement_id.as_uuid());

        let (engagement, before) = self
            .ctx
            .repos
            .engagements
            .try_update(&engagement_id, |e| {
                if e.status == EngagementStatus::Disputed {
                    e.authorize(&actor)?;
                    return Err(MarketError::invalid_state(messages::ENGAGEMENT_UNDER_DISPUTE));
                }
                let before = e.transitions.len();
                e.transition(to, actor, reason, Timestamp::now())?;
                Ok::<_, MarketError>((e.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND)))?;

        self.ctx
            .journal
            .record_since(*engagement.id.as_uuid(), &engagement.transitions, before);
        tracing::info!(
            engagement_id = %engagement.id,
            to = %to,
            actor = %actor,
            "engagement transition"
        );
        Ok(engagement)
    }

    /// ACCEPTED → ACTIVE, capturing the engagement total into escrow.
    ///
    /// A failed capture leaves the engagement accepted with no escrow.
    pub fn activate(
        &self,
        engagement_id: EngagementId,
        actor: Actor,
        payment_method_ref: &str,
    ) -> Result<Engagement, MarketError> {
        let (engagement, escrow) = self
            .activate_inner(engagement_id, actor, payment_method_ref)
            .map_err(|e| rejected("engagement.activate", e))?;
        let parties = [engagement.seeker_id, engagement.provider_id];
        let mut outbox = Outbox::new();
        outbox.push_all(
            NotificationEvent::EscrowCaptured,
            &parties,
            escrow_payload(&escrow),
        );
        outbox.push_all(
            NotificationEvent::EngagementStatusChanged,
            &parties,
            engagement_payload(&engagement),
        );
        outbox.flush(self.ctx.collab.notifier.as_ref());
        Ok(engagement)
    }

    fn activate_inner(
        &self,
        engagement_id: EngagementId,
        actor: Actor,
        payment_method_ref: &str,
    ) -> Result<(Engagement, engage_arbitration::EscrowPayment), MarketError> {
        let repos = &self.ctx.repos;
        if !repos.engagements.contains(&engagement_id) {
            return Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND));
        }
        let _guard = self.ctx.engagement_locks.lock(*engagement_id.as_uuid());

        let current = self.get(engagement_id)?;
        current.authorize(&actor)?;
        if !current.status.can_transition_to(EngagementStatus::Active)
            || current.status != EngagementStatus::Accepted
        {
            return Err(TransitionError::InvalidTransition {
                entity: EngagementStatus::ENTITY,
                from: current.status.to_string(),
                to: EngagementStatus::Active.to_string(),
            }
            .into());
        }
        if repos.engagements.any(|e| {
            e.id != current.id
                && e.request_id == current.request_id
                && e.profile_id == current.profile_id
                && e.status == EngagementStatus::Active
        }) {
            return Err(MarketError::conflict(messages::ENGAGEMENT_PAIR_ACTIVE));
        }
        if current.escrow_id.is_some() || repos.escrows.any(|e| e.engagement_id == current.id) {
            return Err(MarketError::conflict(messages::ESCROW_ALREADY_EXISTS));
        }

        let escrow = self.ledger.capture(
            current.id,
            current.total_amount.clone(),
            payment_method_ref,
        )?;

        let (engagement, before) = repos
            .engagements
            .try_update(&engagement_id, |e| {
                let before = e.transitions.len();
                e.activate(escrow.id, actor, Timestamp::now())?;
                Ok::<_, MarketError>((e.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND)))?;

        self.ctx
            .journal
            .record_since(*engagement.id.as_uuid(), &engagement.transitions, before);
        tracing::info!(
            engagement_id = %engagement.id,
            escrow_id = %escrow.id,
            "engagement activated"
        );
        Ok((engagement, escrow))
    }

    /// Record that the calling party considers the work done.
    pub fn confirm_completion(
        &self,
        engagement_id: EngagementId,
        actor: Actor,
    ) -> Result<Engagement, MarketError> {
        if !self.ctx.repos.engagements.contains(&engagement_id) {
            return Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND));
        }
        let guard = self.ctx.engagement_locks.lock(*engagement_id.as_uuid());
        let (engagement, side) = self
            .ctx
            .repos
            .engagements
            .try_update(&engagement_id, |e| {
                let side = e.confirm_completion(&actor, Timestamp::now())?;
                Ok::<_, MarketError>((e.clone(), side))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND)))
            .map_err(|e| rejected("engagement.confirm_completion", e))?;
        drop(guard);

        tracing::info!(
            engagement_id = %engagement.id,
            side = %side,
            both_confirmed = engagement.both_confirmed(),
            "completion confirmed"
        );
        let mut outbox = Outbox::new();
        outbox.push(
            NotificationEvent::EngagementStatusChanged,
            engagement.party(side.other()),
            json!({
                "engagement_id": engagement.id.to_string(),
                "confirmed_by": side.as_str(),
                "both_confirmed": engagement.both_confirmed(),
            }),
        );
        outbox.flush(self.ctx.collab.notifier.as_ref());
        Ok(engagement)
    }
}

pub(crate) fn engagement_payload(engagement: &Engagement) -> serde_json::Value {
    json!({
        "engagement_id": engagement.id.to_string(),
        "offer_id": engagement.offer_id.to_string(),
        "status": engagement.status.as_str(),
        "total_amount": engagement.total_amount.amount,
        "currency": engagement.total_amount.currency.as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::Harness;
    use engage_adapters::payment::DECLINED_METHOD;
    use engage_core::{ActorId, ErrorKind};
    use engage_state::OfferAction;

    #[test]
    fn unsigned_contract_keeps_gate_closed() {
        let h = Harness::new();
        let offer = h.accepted_offer(10_000);
        h.contracts.set(offer.id, Some(false));
        let err = h
            .market
            .engagements()
            .create_engagement(offer.id, Actor::seeker(offer.seeker_id))
            .unwrap_err();
        assert_eq!(err.message(), messages::CONTRACT_NOT_SIGNED);
    }

    #[test]
    fn contract_service_outage_fails_closed() {
        let h = Harness::new();
        let offer = h.accepted_offer(10_000);
        h.contracts.set(offer.id, None);
        let err = h
            .market
            .engagements()
            .create_engagement(offer.id, Actor::seeker(offer.seeker_id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn pending_offer_cannot_stage_an_engagement() {
        let h = Harness::new();
        let (request, profile) = h.request_and_profile();
        let offer = h.offer(&request, &profile, 10_000, 1);
        let err = h
            .market
            .engagements()
            .create_engagement(offer.id, h.seeker(&request))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn one_engagement_per_offer() {
        let h = Harness::new();
        let offer = h.accepted_offer(10_000);
        let seeker = Actor::seeker(offer.seeker_id);
        let engagement = h
            .market
            .engagements()
            .create_engagement(offer.id, seeker)
            .unwrap();
        assert_eq!(engagement.status, EngagementStatus::Staged);
        assert_eq!(engagement.total_amount.amount, 10_000);

        let err = h
            .market
            .engagements()
            .create_engagement(offer.id, seeker)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.message(), messages::ENGAGEMENT_EXISTS_FOR_OFFER);
    }

    #[test]
    fn strangers_cannot_create_or_move_engagements() {
        let h = Harness::new();
        let offer = h.accepted_offer(10_000);
        let stranger = Actor::provider(ActorId::new());
        let err = h
            .market
            .engagements()
            .create_engagement(offer.id, stranger)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);

        let engagement = h
            .market
            .engagements()
            .create_engagement(offer.id, Actor::seeker(offer.seeker_id))
            .unwrap();
        let err = h
            .market
            .engagements()
            .transition(engagement.id, EngagementStatus::Interviewing, stranger, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(
            h.market.engagements().get(engagement.id).unwrap().status,
            EngagementStatus::Staged
        );
    }

    #[test]
    fn illegal_transition_is_invalid_state_and_mutates_nothing() {
        let h = Harness::new();
        let engagement = h.staged_engagement(10_000);
        let seeker = Actor::seeker(engagement.seeker_id);
        let err = h
            .market
            .engagements()
            .transition(engagement.id, EngagementStatus::Completed, seeker, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let err = h
            .market
            .engagements()
            .transition(engagement.id, EngagementStatus::Active, seeker, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let stored = h.market.engagements().get(engagement.id).unwrap();
        assert_eq!(stored.status, EngagementStatus::Staged);
        assert!(stored.transitions.is_empty());
    }

    #[test]
    fn declined_capture_leaves_engagement_accepted() {
        let h = Harness::new();
        let engagement = h.accepted_engagement(10_000);
        let err = h
            .market
            .engagements()
            .activate(engagement.id, Actor::seeker(engagement.seeker_id), DECLINED_METHOD)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentFailed);
        let stored = h.market.engagements().get(engagement.id).unwrap();
        assert_eq!(stored.status, EngagementStatus::Accepted);
        assert_eq!(stored.escrow_id, None);
    }

    #[test]
    fn activation_links_a_held_escrow() {
        let h = Harness::new();
        let (engagement, escrow) = h.active_engagement(10_000);
        assert_eq!(engagement.escrow_id, Some(escrow.id));
        assert!(engagement.start_date.is_some());
        assert_eq!(escrow.platform_fee, 1_500);
        assert_eq!(escrow.provider_amount, 8_500);

        let err = h
            .market
            .engagements()
            .activate(engagement.id, Actor::seeker(engagement.seeker_id), "pm_card")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(h.processor.executed(engage_adapters::PaymentOp::Capture), 1);
    }

    #[test]
    fn confirmations_are_per_party_and_sticky() {
        let h = Harness::new();
        let (engagement, _) = h.active_engagement(10_000);
        let seeker = Actor::seeker(engagement.seeker_id);
        let provider = Actor::provider(engagement.provider_id);
        let svc = h.market.engagements();

        let first = svc.confirm_completion(engagement.id, seeker).unwrap();
        let at = first.seeker_confirmed_at;
        assert!(!first.both_confirmed());
        let again = svc.confirm_completion(engagement.id, seeker).unwrap();
        assert_eq!(again.seeker_confirmed_at, at);
        assert!(svc.confirm_completion(engagement.id, provider).unwrap().both_confirmed());

        let err = svc
            .confirm_completion(engagement.id, Actor::admin(ActorId::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn rejected_offer_path_never_reaches_engagement() {
        let h = Harness::new();
        let (request, profile) = h.request_and_profile();
        let offer = h.offer(&request, &profile, 10_000, 1);
        h.market
            .offers()
            .respond(
                offer.id,
                OfferAction::Reject { reason: None },
                Actor::provider(profile.provider_id),
            )
            .unwrap();
        let err = h
            .market
            .engagements()
            .create_engagement(offer.id, h.seeker(&request))
            .unwrap_err();
        assert_eq!(err.message(), messages::CONTRACT_NOT_SIGNED);
    }
}
