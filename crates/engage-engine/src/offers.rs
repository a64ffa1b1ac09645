//! # Offer Negotiation Service
//!
//! Every mutation of offers belonging to one talent request runs under
//! that request's lock. Acceptance writes the winner and rejects every
//! other pending sibling in one store write, then assigns the request, so
//! at most one offer per request is ever accepted.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use engage_adapters::NotificationEvent;
use engage_core::{
    messages, Actor, MarketError, OfferId, ProfileId, RequestId, Side, Timestamp,
};
use engage_matching::TalentRequest;
use engage_state::{Offer, OfferAction, OfferStatus, OfferTerms, ResponseOutcome};

use crate::context::{rejected, Context};
use crate::outbox::Outbox;

/// Result of answering an offer.
#[derive(Debug, Clone, Serialize)]
pub struct OfferResponse {
    pub offer: Offer,
    pub outcome: ResponseOutcome,
    /// Sibling offers rejected because this one was accepted.
    pub superseded: Vec<OfferId>,
}

/// Creates and answers offers.
#[derive(Debug, Clone)]
pub struct OfferService {
    ctx: Arc<Context>,
}

impl OfferService {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub fn get(&self, offer_id: OfferId) -> Result<Offer, MarketError> {
        self.ctx
            .repos
            .offers
            .get(&offer_id)
            .ok_or_else(|| MarketError::not_found(messages::OFFER_NOT_FOUND))
    }

    /// All offers made against a request.
    pub fn for_request(&self, request_id: RequestId) -> Vec<Offer> {
        let mut offers = self
            .ctx
            .repos
            .offers
            .filter(|o| o.request_id == request_id);
        offers.sort_by_key(|o| o.created_at);
        offers
    }

    /// Open an offer between a request and a profile.
    ///
    /// The request's seeker or the profile's provider may make it; the
    /// other party answers.
    pub fn create_offer(
        &self,
        request_id: RequestId,
        profile_id: ProfileId,
        terms: OfferTerms,
        actor: Actor,
    ) -> Result<Offer, MarketError> {
        let mut outbox = Outbox::new();
        let offer = self
            .create_inner(request_id, profile_id, terms, actor, &mut outbox)
            .map_err(|e| rejected("offer.create", e))?;
        outbox.flush(self.ctx.collab.notifier.as_ref());
        Ok(offer)
    }

    fn create_inner(
        &self,
        request_id: RequestId,
        profile_id: ProfileId,
        terms: OfferTerms,
        actor: Actor,
        outbox: &mut Outbox,
    ) -> Result<Offer, MarketError> {
        let repos = &self.ctx.repos;
        let request = repos
            .requests
            .get(&request_id)
            .ok_or_else(|| MarketError::not_found(messages::REQUEST_NOT_FOUND))?;
        let profile = repos
            .profiles
            .get(&profile_id)
            .ok_or_else(|| MarketError::not_found(messages::PROFILE_NOT_FOUND))?;

        let offeror = match actor.side() {
            Some(Side::Seeker) if actor.id == request.seeker_id => Side::Seeker,
            Some(Side::Provider) if actor.id == profile.provider_id => Side::Provider,
            _ => {
                return Err(MarketError::permission(
                    "Only the request's seeker or the profile's provider may make an offer",
                ))
            }
        };
        if terms.currency != request.currency {
            return Err(MarketError::validation(format!(
                "Offer currency {} does not match request currency {}",
                terms.currency, request.currency
            )));
        }

        let now = Timestamp::now();
        let guard = self.ctx.request_locks.lock(*request_id.as_uuid());

        let request = repos
            .requests
            .get(&request_id)
            .ok_or_else(|| MarketError::not_found(messages::REQUEST_NOT_FOUND))?;
        if !request.is_open() {
            return Err(MarketError::invalid_state(messages::REQUEST_NOT_ACTIVE));
        }
        if repos
            .offers
            .any(|o| o.request_id == request_id && o.profile_id == profile_id && o.is_open())
        {
            return Err(MarketError::conflict(messages::OFFER_ALREADY_OPEN));
        }

        let offer = Offer::new(
            request_id,
            profile_id,
            request.seeker_id,
            profile.provider_id,
            terms,
            offeror,
            &self.ctx.config.negotiation_policy(),
            now,
        )?;
        repos.offers.insert(offer.id, offer.clone());
        drop(guard);

        tracing::info!(
            offer_id = %offer.id,
            request_id = %request_id,
            profile_id = %profile_id,
            offeror = %offeror,
            total_amount = offer.total_amount,
            "offer created"
        );
        outbox.push(
            NotificationEvent::OfferReceived,
            offer.party(offer.responder()),
            offer_payload(&offer),
        );
        Ok(offer)
    }

    /// Answer an offer now.
    pub fn respond(
        &self,
        offer_id: OfferId,
        action: OfferAction,
        actor: Actor,
    ) -> Result<OfferResponse, MarketError> {
        self.respond_at(offer_id, action, actor, Timestamp::now())
    }

    /// Answer an offer as of `now`.
    ///
    /// A pending offer whose expiry has passed is moved to `expired` and
    /// the call fails with "Offer has expired".
    pub fn respond_at(
        &self,
        offer_id: OfferId,
        action: OfferAction,
        actor: Actor,
        now: Timestamp,
    ) -> Result<OfferResponse, MarketError> {
        let mut outbox = Outbox::new();
        let result = self.respond_inner(offer_id, action, actor, now, &mut outbox);
        outbox.flush(self.ctx.collab.notifier.as_ref());
        result.map_err(|e| rejected("offer.respond", e))
    }

    fn respond_inner(
        &self,
        offer_id: OfferId,
        action: OfferAction,
        actor: Actor,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> Result<OfferResponse, MarketError> {
        let repos = &self.ctx.repos;
        let request_id = self.get(offer_id)?.request_id;

        let _guard = self.ctx.request_locks.lock(*request_id.as_uuid());

        let mut offer = self.get(offer_id)?;
        if offer.status == OfferStatus::Pending {
            offer.check_responder(&actor)?;
            let before = offer.transitions.len();
            if offer.expire_if_stale(Actor::system(), now) {
                repos.offers.insert(offer.id, offer.clone());
                self.ctx
                    .journal
                    .record_since(*offer.id.as_uuid(), &offer.transitions, before);
                tracing::info!(offer_id = %offer.id, "offer expired on response");
                outbox.push_all(
                    NotificationEvent::OfferExpired,
                    &[offer.seeker_id, offer.provider_id],
                    offer_payload(&offer),
                );
                return Err(MarketError::invalid_state(messages::OFFER_EXPIRED));
            }
        }

        if matches!(action, OfferAction::Accept) {
            let open = repos
                .requests
                .get(&request_id)
                .is_some_and(|r: TalentRequest| r.is_open());
            if !open && offer.status == OfferStatus::Pending {
                return Err(MarketError::invalid_state(messages::REQUEST_NOT_ACTIVE));
            }
        }

        let policy = self.ctx.config.negotiation_policy();
        let before = offer.transitions.len();
        let outcome = offer.respond(action, actor, &policy, now)?;

        let mut superseded = Vec::new();
        if outcome == ResponseOutcome::Accepted {
            let losers = repos.offers.write_all(|map| {
                map.insert(offer.id, offer.clone());
                let mut losers = Vec::new();
                for sibling in map.values_mut() {
                    if sibling.request_id != request_id || sibling.id == offer.id {
                        continue;
                    }
                    let sibling_before = sibling.transitions.len();
                    if sibling.supersede(actor, offer.id, now) {
                        losers.push((sibling.clone(), sibling_before));
                    }
                }
                losers
            });
            let request_before = repos
                .requests
                .try_update(&request_id, |r| {
                    let before = r.transitions.len();
                    r.assign(actor)?;
                    Ok::<_, MarketError>((before, r.transitions.clone()))
                })
                .ok_or_else(|| MarketError::not_found(messages::REQUEST_NOT_FOUND))??;
            self.ctx
                .journal
                .record_since(*request_id.as_uuid(), &request_before.1, request_before.0);

            for (loser, loser_before) in losers {
                self.ctx
                    .journal
                    .record_since(*loser.id.as_uuid(), &loser.transitions, loser_before);
                outbox.push_all(
                    NotificationEvent::OfferRejected,
                    &[loser.seeker_id, loser.provider_id],
                    offer_payload(&loser),
                );
                superseded.push(loser.id);
            }
        } else {
            repos.offers.insert(offer.id, offer.clone());
        }
        self.ctx
            .journal
            .record_since(*offer.id.as_uuid(), &offer.transitions, before);

        tracing::info!(
            offer_id = %offer.id,
            outcome = ?outcome,
            status = %offer.status,
            round = offer.counter_rounds,
            superseded = superseded.len(),
            "offer answered"
        );

        let payload = offer_payload(&offer);
        match outcome {
            ResponseOutcome::Accepted => outbox.push(
                NotificationEvent::OfferAccepted,
                offer.party(offer.offeror),
                payload,
            ),
            ResponseOutcome::Rejected => outbox.push(
                NotificationEvent::OfferRejected,
                offer.party(offer.offeror),
                payload,
            ),
            ResponseOutcome::Countered => outbox.push(
                NotificationEvent::OfferCountered,
                offer.party(offer.responder()),
                payload,
            ),
            ResponseOutcome::RoundLimitReached => outbox.push_all(
                NotificationEvent::OfferExpired,
                &[offer.seeker_id, offer.provider_id],
                payload,
            ),
        }

        Ok(OfferResponse {
            offer,
            outcome,
            superseded,
        })
    }

    /// Expire every pending offer whose expiry is at or before `now`.
    ///
    /// Returns the ids of the offers that were expired by this sweep.
    pub fn expire_stale(&self, now: Timestamp) -> Vec<OfferId> {
        let stale = self
            .ctx
            .repos
            .offers
            .filter(|o| o.status == OfferStatus::Pending && o.is_expired_at(now));

        let mut outbox = Outbox::new();
        let mut expired = Vec::new();
        for candidate in stale {
            let guard = self.ctx.request_locks.lock(*candidate.request_id.as_uuid());
            let updated = self.ctx.repos.offers.try_update(&candidate.id, |o| {
                let before = o.transitions.len();
                if o.expire_if_stale(Actor::system(), now) {
                    Ok((o.clone(), before))
                } else {
                    Err(())
                }
            });
            drop(guard);

            if let Some(Ok((offer, before))) = updated {
                self.ctx
                    .journal
                    .record_since(*offer.id.as_uuid(), &offer.transitions, before);
                outbox.push_all(
                    NotificationEvent::OfferExpired,
                    &[offer.seeker_id, offer.provider_id],
                    offer_payload(&offer),
                );
                expired.push(offer.id);
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "stale offers expired");
        }
        outbox.flush(self.ctx.collab.notifier.as_ref());
        expired
    }

    /// Close a talent request and reject its pending offers.
    pub fn close_request(
        &self,
        request_id: RequestId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<TalentRequest, MarketError> {
        let now = Timestamp::now();
        if !self.ctx.repos.requests.contains(&request_id) {
            return Err(MarketError::not_found(messages::REQUEST_NOT_FOUND));
        }
        let guard = self.ctx.request_locks.lock(*request_id.as_uuid());

        let (request, before) = self
            .ctx
            .repos
            .requests
            .try_update(&request_id, |r| {
                let before = r.transitions.len();
                r.close(actor, reason)?;
                Ok::<_, MarketError>((r.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::REQUEST_NOT_FOUND)))
            .map_err(|e| rejected("request.close", e))?;

        let withdrawn = self.ctx.repos.offers.write_all(|map| {
            map.values_mut()
                .filter(|o| o.request_id == request_id)
                .filter_map(|o| {
                    let before = o.transitions.len();
                    o.withdraw(actor, "talent request closed", now)
                        .then(|| (o.clone(), before))
                })
                .collect::<Vec<_>>()
        });
        drop(guard);

        self.ctx
            .journal
            .record_since(*request_id.as_uuid(), &request.transitions, before);
        let mut outbox = Outbox::new();
        for (offer, offer_before) in &withdrawn {
            self.ctx
                .journal
                .record_since(*offer.id.as_uuid(), &offer.transitions, *offer_before);
            outbox.push(
                NotificationEvent::OfferRejected,
                offer.provider_id,
                offer_payload(offer),
            );
        }
        tracing::info!(
            request_id = %request_id,
            withdrawn = withdrawn.len(),
            "talent request closed"
        );
        outbox.flush(self.ctx.collab.notifier.as_ref());
        Ok(request)
    }
}

fn offer_payload(offer: &Offer) -> serde_json::Value {
    json!({
        "offer_id": offer.id.to_string(),
        "request_id": offer.request_id.to_string(),
        "status": offer.status.as_str(),
        "total_amount": offer.total_amount,
        "currency": offer.terms.currency.as_str(),
        "counter_rounds": offer.counter_rounds,
    })
}
