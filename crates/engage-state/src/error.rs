use engage_core::{messages, EntityKind, MarketError};
use thiserror::Error;

/// Rejections raised by the offer and engagement state machines.
///
/// A rejected call never mutates the entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The transition table has no edge from `from` to `to`.
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        from: String,
        to: String,
    },

    /// The offer is no longer pending.
    #[error("offer is {status}, not pending")]
    OfferAlreadyResponded { status: String },

    /// The offer's expiry instant has passed.
    #[error("offer expired at {expired_at}")]
    OfferExpired { expired_at: String },

    /// The current offeror tried to answer its own offer.
    #[error("actor {actor} made the current offer and cannot answer it")]
    SelfResponse { actor: String },

    /// The actor is not a party to the entity.
    #[error("actor {actor} is not a party to this {entity}")]
    NotAParty { entity: EntityKind, actor: String },

    /// Offer terms failed validation.
    #[error("invalid offer terms: {0}")]
    InvalidTerms(String),

    /// Completion can only be confirmed while active or completed.
    #[error("completion cannot be confirmed while the engagement is {status}")]
    CompletionNotAllowed { status: String },

    /// The contract gate is closed.
    #[error("offer {offer} is not accepted and fully signed")]
    ContractNotSigned { offer: String },
}

impl From<TransitionError> for MarketError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { .. } | TransitionError::CompletionNotAllowed { .. } => {
                MarketError::invalid_state(err.to_string())
            }
            TransitionError::OfferAlreadyResponded { .. } => {
                MarketError::invalid_state(messages::OFFER_ALREADY_RESPONDED)
            }
            TransitionError::OfferExpired { .. } => MarketError::invalid_state(messages::OFFER_EXPIRED),
            TransitionError::SelfResponse { .. } => MarketError::permission(messages::OFFER_SELF_RESPONSE),
            TransitionError::NotAParty { entity, .. } => match entity {
                EntityKind::Engagement => MarketError::permission(messages::ENGAGEMENT_NOT_A_PARTY),
                _ => MarketError::permission(err.to_string()),
            },
            TransitionError::InvalidTerms(msg) => MarketError::validation(msg),
            TransitionError::ContractNotSigned { .. } => {
                MarketError::invalid_state(messages::CONTRACT_NOT_SIGNED)
            }
        }
    }
}
