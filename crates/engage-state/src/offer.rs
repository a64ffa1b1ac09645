//! # Offer Negotiation
//!
//! One [`Offer`] per negotiation thread between a seeker and a provider for a
//! (request, profile) pair.
//!
//! ```text
//!           ┌──────── counter() ────────┐
//!           ▼                           │
//!        Pending ──▶ Countered ─────────┘
//!        │  │  │          │
//!        │  │  └──────────┴──▶ Expired
//!        │  └──▶ Rejected
//!        └─────▶ Accepted
//! ```
//!
//! A counter is recorded as `pending → countered → pending` inside one call
//! and swaps the offeror, so a stored offer is never at rest in `Countered`.
//! The party that made the current terms can never answer them.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use engage_core::{
    Actor, ActorId, Currency, EntityKind, FeePolicy, Lifecycle, Money, OfferId, ProfileId,
    RequestId, Side, Timestamp, TransitionRecord,
};

use crate::error::TransitionError;

/// Offer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Awaiting a response from the party that did not make the current terms.
    Pending,
    /// Terms agreed. Terminal state.
    Accepted,
    /// Declined, or superseded by another accepted offer. Terminal state.
    Rejected,
    /// New terms proposed; transient.
    Countered,
    /// Lapsed or ran out of negotiation rounds. Terminal state.
    Expired,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Countered => "countered",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for OfferStatus {
    const ENTITY: EntityKind = EntityKind::Offer;

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Rejected, Self::Countered, Self::Expired],
            Self::Countered => &[Self::Pending, Self::Expired],
            Self::Accepted | Self::Rejected | Self::Expired => &[],
        }
    }
}

/// Commercial terms of an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTerms {
    /// Hourly rate in minor units.
    pub hourly_rate: i64,
    pub duration_hours: u32,
    pub currency: Currency,
    pub message: Option<String>,
}

impl OfferTerms {
    /// `hourly_rate × duration_hours`, which must be positive and fit in `i64`.
    pub fn total_amount(&self) -> Result<i64, TransitionError> {
        let total = self
            .hourly_rate
            .checked_mul(i64::from(self.duration_hours))
            .ok_or_else(|| TransitionError::InvalidTerms("offer total overflows".into()))?;
        if total <= 0 {
            return Err(TransitionError::InvalidTerms(format!(
                "offer total must be positive, got {total}"
            )));
        }
        Ok(total)
    }
}

/// New terms proposed by a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterTerms {
    pub hourly_rate: i64,
    /// Keeps the current duration when absent.
    pub duration_hours: Option<u32>,
    pub message: Option<String>,
}

/// A response to a pending offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OfferAction {
    Accept,
    Reject {
        #[serde(default)]
        reason: Option<String>,
    },
    Counter(CounterTerms),
}

/// Negotiation limits applied to every offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationPolicy {
    pub fee: FeePolicy,
    /// Counters allowed per offer; the next one expires the offer.
    pub max_rounds: u32,
    /// Lifetime of each set of terms. `None` disables expiry.
    pub ttl: Option<Duration>,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            fee: FeePolicy::default(),
            max_rounds: 3,
            ttl: Some(Duration::days(7)),
        }
    }
}

/// What a successful [`Offer::respond`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    Accepted,
    Rejected,
    Countered,
    /// The counter exceeded the round limit and the offer expired instead.
    RoundLimitReached,
}

/// An offer between a seeker and a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub request_id: RequestId,
    pub profile_id: ProfileId,
    pub seeker_id: ActorId,
    pub provider_id: ActorId,
    pub terms: OfferTerms,
    pub total_amount: i64,
    pub platform_fee: i64,
    pub provider_amount: i64,
    pub status: OfferStatus,
    /// The side that proposed the current terms.
    pub offeror: Side,
    pub counter_rounds: u32,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub transitions: Vec<TransitionRecord<OfferStatus>>,
}

impl Offer {
    /// Open a new pending offer.
    ///
    /// The fee split is fixed from `policy.fee` at creation and recomputed
    /// on every counter.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: RequestId,
        profile_id: ProfileId,
        seeker_id: ActorId,
        provider_id: ActorId,
        terms: OfferTerms,
        offeror: Side,
        policy: &NegotiationPolicy,
        now: Timestamp,
    ) -> Result<Self, TransitionError> {
        let total = terms.total_amount()?;
        let split = policy
            .fee
            .split(total)
            .map_err(|e| TransitionError::InvalidTerms(e.to_string()))?;
        Ok(Self {
            id: OfferId::new(),
            request_id,
            profile_id,
            seeker_id,
            provider_id,
            terms,
            total_amount: split.amount,
            platform_fee: split.platform_fee,
            provider_amount: split.provider_amount,
            status: OfferStatus::Pending,
            offeror,
            counter_rounds: 0,
            expires_at: policy.ttl.map(|ttl| now.plus(ttl)),
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        })
    }

    /// The party id on a given side.
    pub fn party(&self, side: Side) -> ActorId {
        match side {
            Side::Seeker => self.seeker_id,
            Side::Provider => self.provider_id,
        }
    }

    /// The party expected to answer the current terms.
    pub fn responder(&self) -> Side {
        self.offeror.other()
    }

    /// Whether the offer can still be answered.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn total(&self) -> Money {
        Money::new(self.total_amount, self.terms.currency.clone())
    }

    /// Whether the expiry instant is at or before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Check that `actor` may answer the current terms.
    pub fn check_responder(&self, actor: &Actor) -> Result<Side, TransitionError> {
        let side = actor
            .side()
            .filter(|s| actor.is_party(*s, self.party(*s)))
            .ok_or_else(|| TransitionError::NotAParty {
                entity: EntityKind::Offer,
                actor: actor.to_string(),
            })?;
        if side == self.offeror {
            return Err(TransitionError::SelfResponse {
                actor: actor.to_string(),
            });
        }
        Ok(side)
    }

    /// Expire a pending offer whose expiry has passed.
    ///
    /// Returns `true` when the offer was moved to `expired`.
    pub fn expire_if_stale(&mut self, actor: Actor, now: Timestamp) -> bool {
        if self.status != OfferStatus::Pending || !self.is_expired_at(now) {
            return false;
        }
        self.record(OfferStatus::Expired, actor, Some("offer lapsed".into()), now);
        true
    }

    /// Apply a response from the non-offering party.
    ///
    /// Checks run in order: the offer must be pending, the actor must be
    /// the responder, and the offer must not have lapsed. A lapsed offer
    /// is left pending here; callers run [`expire_if_stale`](Self::expire_if_stale)
    /// first so the expiry is recorded.
    pub fn respond(
        &mut self,
        action: OfferAction,
        actor: Actor,
        policy: &NegotiationPolicy,
        now: Timestamp,
    ) -> Result<ResponseOutcome, TransitionError> {
        if self.status != OfferStatus::Pending {
            return Err(TransitionError::OfferAlreadyResponded {
                status: self.status.to_string(),
            });
        }
        let side = self.check_responder(&actor)?;
        if let Some(at) = self.expires_at.filter(|at| *at <= now) {
            return Err(TransitionError::OfferExpired {
                expired_at: at.to_string(),
            });
        }

        match action {
            OfferAction::Accept => {
                self.record(OfferStatus::Accepted, actor, None, now);
                Ok(ResponseOutcome::Accepted)
            }
            OfferAction::Reject { reason } => {
                self.record(OfferStatus::Rejected, actor, reason, now);
                Ok(ResponseOutcome::Rejected)
            }
            OfferAction::Counter(counter) => self.counter(side, counter, actor, policy, now),
        }
    }

    fn counter(
        &mut self,
        side: Side,
        counter: CounterTerms,
        actor: Actor,
        policy: &NegotiationPolicy,
        now: Timestamp,
    ) -> Result<ResponseOutcome, TransitionError> {
        if self.counter_rounds >= policy.max_rounds {
            self.record(
                OfferStatus::Expired,
                actor,
                Some(format!(
                    "negotiation exceeded {} counter rounds",
                    policy.max_rounds
                )),
                now,
            );
            return Ok(ResponseOutcome::RoundLimitReached);
        }

        let terms = OfferTerms {
            hourly_rate: counter.hourly_rate,
            duration_hours: counter.duration_hours.unwrap_or(self.terms.duration_hours),
            currency: self.terms.currency.clone(),
            message: counter.message,
        };
        let split = policy
            .fee
            .split(terms.total_amount()?)
            .map_err(|e| TransitionError::InvalidTerms(e.to_string()))?;

        self.record(OfferStatus::Countered, actor, terms.message.clone(), now);
        self.record(OfferStatus::Pending, actor, None, now);
        self.terms = terms;
        self.total_amount = split.amount;
        self.platform_fee = split.platform_fee;
        self.provider_amount = split.provider_amount;
        self.offeror = side;
        self.counter_rounds += 1;
        self.expires_at = policy.ttl.map(|ttl| now.plus(ttl));
        Ok(ResponseOutcome::Countered)
    }

    /// Reject an open offer because a sibling on the same request won.
    pub fn supersede(&mut self, actor: Actor, winner: OfferId, now: Timestamp) -> bool {
        self.withdraw(actor, format!("superseded by {winner}"), now)
    }

    /// Reject a pending offer for a reason outside the negotiation, such
    /// as its request being closed. Returns `false` if it was not pending.
    pub fn withdraw(&mut self, actor: Actor, reason: impl Into<String>, now: Timestamp) -> bool {
        if self.status != OfferStatus::Pending {
            return false;
        }
        self.record(OfferStatus::Rejected, actor, Some(reason.into()), now);
        true
    }

    fn record(&mut self, to: OfferStatus, actor: Actor, reason: Option<String>, now: Timestamp) {
        debug_assert!(self.status.can_transition_to(to));
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            actor,
            at: now,
            reason,
        });
        self.status = to;
        self.updated_at = now;
    }
}
