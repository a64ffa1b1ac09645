//! # Arbitration Error Types
//!
//! Escrow and dispute rejections. Every variant names the record it refers
//! to; the conversion into [`MarketError`] swaps that detail for the fixed
//! user-visible message.

use engage_core::{messages, EntityKind, MarketError, MoneyError};
use thiserror::Error;

/// Errors from escrow and dispute operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    /// Escrow operation violated its status precondition.
    #[error("escrow {escrow_id} cannot perform {operation} in status {status}")]
    InvalidEscrowOperation {
        escrow_id: String,
        operation: String,
        status: String,
    },

    #[error("engagement {engagement_id} is {status}, not completed")]
    EngagementNotCompleted {
        engagement_id: String,
        status: String,
    },

    #[error("engagement {engagement_id} lacks a completion confirmation")]
    CompletionNotConfirmed { engagement_id: String },

    /// An unresolved dispute freezes the escrow.
    #[error("escrow {escrow_id} has an open dispute")]
    OpenDispute { escrow_id: String },

    /// Refund outside the allowed range for the resolution.
    #[error("refund of {requested} is outside the allowed range for escrow {escrow_id} holding {held}")]
    InvalidRefundAmount {
        escrow_id: String,
        requested: i64,
        held: i64,
    },

    /// The dispute table has no edge from `from` to `to`.
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        from: String,
        to: String,
    },

    #[error("dispute {dispute_id} is already resolved")]
    DisputeAlreadyResolved { dispute_id: String },

    #[error("actor {actor} is not an admin")]
    AdminOnly { actor: String },

    #[error("actor {actor} is not a party to dispute {dispute_id}")]
    NotAParty { dispute_id: String, actor: String },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl From<ArbitrationError> for MarketError {
    fn from(err: ArbitrationError) -> Self {
        match err {
            ArbitrationError::InvalidEscrowOperation { .. } => {
                MarketError::invalid_state(messages::ESCROW_NOT_HELD)
            }
            ArbitrationError::EngagementNotCompleted { .. } => {
                MarketError::invalid_state(messages::ENGAGEMENT_NOT_COMPLETED)
            }
            ArbitrationError::CompletionNotConfirmed { .. } => {
                MarketError::invalid_state(messages::COMPLETION_NOT_CONFIRMED)
            }
            ArbitrationError::OpenDispute { .. } => {
                MarketError::invalid_state(messages::ESCROW_OPEN_DISPUTE)
            }
            ArbitrationError::InvalidRefundAmount { .. } => MarketError::validation(err.to_string()),
            ArbitrationError::InvalidTransition { .. } => MarketError::invalid_state(err.to_string()),
            ArbitrationError::DisputeAlreadyResolved { .. } => {
                MarketError::invalid_state(messages::DISPUTE_ALREADY_RESOLVED)
            }
            ArbitrationError::AdminOnly { .. } => MarketError::permission(messages::DISPUTE_ADMIN_ONLY),
            ArbitrationError::NotAParty { .. } => MarketError::permission(messages::DISPUTE_NOT_A_PARTY),
            ArbitrationError::Money(e) => e.into(),
        }
    }
}
