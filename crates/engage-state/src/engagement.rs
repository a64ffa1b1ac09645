//! # Engagement Lifecycle
//!
//! ```text
//! Staged ──▶ Interviewing ──▶ Accepted ──▶ Active ──▶ Completed
//!                 │                          │  ▲
//!                 ▼                          │  │ release
//!              Rejected                      ▼  │
//!                                         Disputed ──▶ Terminated
//!                                            (Active ──▶ Terminated)
//! ```
//!
//! Only the two parties and admins may drive an engagement. An engagement
//! is created once per accepted offer.

use serde::{Deserialize, Serialize};

use engage_core::{
    Actor, ActorId, EngagementId, EntityKind, EscrowId, Lifecycle, Money, OfferId, ProfileId,
    RequestId, Side, Timestamp, TransitionRecord,
};

use crate::error::TransitionError;
use crate::offer::Offer;

/// Engagement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    Staged,
    Interviewing,
    Accepted,
    Active,
    Completed,
    Rejected,
    Terminated,
    Disputed,
}

impl EngagementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Interviewing => "interviewing",
            Self::Accepted => "accepted",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Terminated => "terminated",
            Self::Disputed => "disputed",
        }
    }
}

impl std::fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for EngagementStatus {
    const ENTITY: EntityKind = EntityKind::Engagement;

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Staged => &[Self::Interviewing],
            Self::Interviewing => &[Self::Accepted, Self::Rejected],
            Self::Accepted => &[Self::Active],
            Self::Active => &[Self::Completed, Self::Terminated, Self::Disputed],
            Self::Disputed => &[Self::Active, Self::Terminated],
            Self::Completed | Self::Rejected | Self::Terminated => &[],
        }
    }
}

/// An engagement between a seeker and a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engagement {
    pub id: EngagementId,
    pub offer_id: OfferId,
    pub request_id: RequestId,
    pub profile_id: ProfileId,
    pub seeker_id: ActorId,
    pub provider_id: ActorId,
    pub status: EngagementStatus,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub total_amount: Money,
    pub seeker_confirmed_at: Option<Timestamp>,
    pub provider_confirmed_at: Option<Timestamp>,
    pub escrow_id: Option<EscrowId>,
    pub created_at: Timestamp,
    pub transitions: Vec<TransitionRecord<EngagementStatus>>,
}

impl Engagement {
    /// Stage an engagement for an accepted offer.
    ///
    /// The contract gate must already have been checked.
    pub fn from_offer(offer: &Offer, now: Timestamp) -> Self {
        Self {
            id: EngagementId::new(),
            offer_id: offer.id,
            request_id: offer.request_id,
            profile_id: offer.profile_id,
            seeker_id: offer.seeker_id,
            provider_id: offer.provider_id,
            status: EngagementStatus::Staged,
            start_date: None,
            end_date: None,
            total_amount: offer.total(),
            seeker_confirmed_at: None,
            provider_confirmed_at: None,
            escrow_id: None,
            created_at: now,
            transitions: Vec::new(),
        }
    }

    /// The side `actor` speaks for on this engagement, if it is a party.
    pub fn side_of(&self, actor: &Actor) -> Option<Side> {
        actor.side().filter(|s| actor.is_party(*s, self.party(*s)))
    }

    pub fn party(&self, side: Side) -> ActorId {
        match side {
            Side::Seeker => self.seeker_id,
            Side::Provider => self.provider_id,
        }
    }

    /// Parties and admins may act; nobody else.
    pub fn authorize(&self, actor: &Actor) -> Result<(), TransitionError> {
        if actor.is_admin() || self.side_of(actor).is_some() {
            Ok(())
        } else {
            Err(TransitionError::NotAParty {
                entity: EntityKind::Engagement,
                actor: actor.to_string(),
            })
        }
    }

    /// Whether the engagement can still change.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn both_confirmed(&self) -> bool {
        self.seeker_confirmed_at.is_some() && self.provider_confirmed_at.is_some()
    }

    /// Move to `to` if the table allows it and the actor may act.
    ///
    /// Sets `start_date` on the first activation and `end_date` on
    /// completion or termination.
    pub fn transition(
        &mut self,
        to: EngagementStatus,
        actor: Actor,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.authorize(&actor)?;
        if !self.status.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                entity: EntityKind::Engagement,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        match to {
            EngagementStatus::Active if self.start_date.is_none() => self.start_date = Some(now),
            EngagementStatus::Completed | EngagementStatus::Terminated => {
                self.end_date = Some(now)
            }
            _ => {}
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

    /// ACCEPTED → ACTIVE, linking the captured escrow.
    pub fn activate(
        &mut self,
        escrow_id: EscrowId,
        actor: Actor,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.transition(EngagementStatus::Active, actor, None, now)?;
        self.escrow_id = Some(escrow_id);
        Ok(())
    }

    /// Record that a party considers the work done.
    ///
    /// Allowed while active or completed. Repeated confirmations keep the
    /// first timestamp.
    pub fn confirm_completion(&mut self, actor: &Actor, now: Timestamp) -> Result<Side, TransitionError> {
        let side = self.side_of(actor).ok_or_else(|| TransitionError::NotAParty {
            entity: EntityKind::Engagement,
            actor: actor.to_string(),
        })?;
        if !matches!(
            self.status,
            EngagementStatus::Active | EngagementStatus::Completed
        ) {
            return Err(TransitionError::CompletionNotAllowed {
                status: self.status.to_string(),
            });
        }
        let slot = match side {
            Side::Seeker => &mut self.seeker_confirmed_at,
            Side::Provider => &mut self.provider_confirmed_at,
        };
        slot.get_or_insert(now);
        Ok(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::{NegotiationPolicy, OfferAction, OfferTerms};
    use engage_core::Currency;

    fn accepted_offer() -> (Offer, Actor, Actor) {
        let seeker = Actor::seeker(ActorId::new());
        let provider = Actor::provider(ActorId::new());
        let policy = NegotiationPolicy::default();
        let now = Timestamp::now();
        let mut offer = Offer::new(
            RequestId::new(),
            ProfileId::new(),
            seeker.id,
            provider.id,
            OfferTerms {
                hourly_rate: 5_000,
                duration_hours: 40,
                currency: Currency::usd(),
                message: None,
            },
            Side::Seeker,
            &policy,
            now,
        )
        .unwrap();
        offer
            .respond(OfferAction::Accept, provider, &policy, now)
            .unwrap();
        (offer, seeker, provider)
    }

    fn active() -> (Engagement, Actor, Actor) {
        let (offer, seeker, provider) = accepted_offer();
        let now = Timestamp::now();
        let mut e = Engagement::from_offer(&offer, now);
        e.transition(EngagementStatus::Interviewing, seeker, None, now).unwrap();
        e.transition(EngagementStatus::Accepted, seeker, None, now).unwrap();
        e.activate(EscrowId::new(), seeker, now).unwrap();
        (e, seeker, provider)
    }

    #[test]
    fn staged_from_offer() {
        let (offer, ..) = accepted_offer();
        let e = Engagement::from_offer(&offer, Timestamp::now());
        assert_eq!(e.status, EngagementStatus::Staged);
        assert_eq!(e.total_amount.amount, 200_000);
        assert_eq!(e.offer_id, offer.id);
    }

    #[test]
    fn happy_path_sets_dates() {
        let (mut e, seeker, _) = active();
        assert!(e.start_date.is_some());
        assert!(e.escrow_id.is_some());
        e.transition(EngagementStatus::Completed, seeker, None, Timestamp::now())
            .unwrap();
        assert!(e.end_date.is_some());
        assert!(e.status.is_terminal());
        assert_eq!(e.transitions.len(), 4);
    }

    #[test]
    fn illegal_transition_does_not_mutate() {
        let (offer, seeker, _) = accepted_offer();
        let mut e = Engagement::from_offer(&offer, Timestamp::now());
        let err = e
            .transition(EngagementStatus::Active, seeker, None, Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(e.status, EngagementStatus::Staged);
        assert!(e.transitions.is_empty());
    }

    #[test]
    fn outsiders_are_refused() {
        let (mut e, ..) = active();
        let err = e
            .transition(
                EngagementStatus::Terminated,
                Actor::provider(ActorId::new()),
                None,
                Timestamp::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TransitionError::NotAParty { .. }));
        assert!(e
            .transition(
                EngagementStatus::Terminated,
                Actor::admin(ActorId::new()),
                Some("policy breach".into()),
                Timestamp::now()
            )
            .is_ok());
    }

    #[test]
    fn dispute_then_resume() {
        let (mut e, _, provider) = active();
        let now = Timestamp::now();
        e.transition(EngagementStatus::Disputed, provider, None, now).unwrap();
        e.transition(EngagementStatus::Active, provider, None, now).unwrap();
        assert_eq!(e.status, EngagementStatus::Active);
    }

    #[test]
    fn confirmations_are_per_side_and_sticky() {
        let (mut e, seeker, provider) = active();
        let t1 = Timestamp::parse("2026-05-01T00:00:00Z").unwrap();
        let t2 = Timestamp::parse("2026-05-02T00:00:00Z").unwrap();
        assert_eq!(e.confirm_completion(&seeker, t1).unwrap(), Side::Seeker);
        assert!(!e.both_confirmed());
        e.confirm_completion(&seeker, t2).unwrap();
        assert_eq!(e.seeker_confirmed_at, Some(t1));
        e.confirm_completion(&provider, t2).unwrap();
        assert!(e.both_confirmed());
    }

    #[test]
    fn admin_cannot_confirm_and_staged_cannot_confirm() {
        let (mut e, seeker, _) = active();
        assert!(e
            .confirm_completion(&Actor::admin(ActorId::new()), Timestamp::now())
            .is_err());

        let (offer, seeker2, _) = accepted_offer();
        let mut staged = Engagement::from_offer(&offer, Timestamp::now());
        let err = staged.confirm_completion(&seeker2, Timestamp::now()).unwrap_err();
        assert!(matches!(err, TransitionError::CompletionNotAllowed { .. }));
        assert!(e.confirm_completion(&seeker, Timestamp::now()).is_ok());
    }
}
