//! # Error Taxonomy
//!
//! [`MarketError`] is the error every service operation returns. Domain
//! crates keep their own structured errors (transition rejections, escrow
//! precondition failures, processor errors) and convert into this type at
//! the service boundary.
//!
//! The `Display` output of a `MarketError` is the user-visible message.
//! Messages in [`messages`] are fixed and must not change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::MoneyError;

/// Fixed user-visible messages.
pub mod messages {
    pub const OFFER_NOT_FOUND: &str = "Offer not found";
    pub const OFFER_ALREADY_RESPONDED: &str = "Offer has already been responded to";
    pub const OFFER_EXPIRED: &str = "Offer has expired";
    pub const OFFER_ALREADY_OPEN: &str =
        "An open offer already exists for this request and profile";
    pub const OFFER_SELF_RESPONSE: &str = "Offer must be answered by the other party";
    pub const REQUEST_NOT_FOUND: &str = "Talent request not found";
    pub const REQUEST_NOT_ACTIVE: &str = "Talent request is not active";
    pub const PROFILE_NOT_FOUND: &str = "Talent profile not found";
    pub const ENGAGEMENT_NOT_FOUND: &str = "Engagement not found";
    pub const ENGAGEMENT_EXISTS_FOR_OFFER: &str = "An engagement already exists for this offer";
    pub const ENGAGEMENT_ALREADY_OPEN: &str =
        "An engagement is already open for this request and profile";
    pub const ENGAGEMENT_PAIR_ACTIVE: &str =
        "Another engagement for this request and profile is active";
    pub const ENGAGEMENT_UNDER_DISPUTE: &str = "Engagement is under dispute";
    pub const ENGAGEMENT_NOT_COMPLETED: &str = "Engagement is not completed";
    pub const ENGAGEMENT_NOT_A_PARTY: &str = "Actor is not a party to this engagement";
    pub const CONTRACT_NOT_SIGNED: &str = "Contract is not fully signed";
    pub const COMPLETION_NOT_CONFIRMED: &str = "Both parties must confirm completion";
    pub const ESCROW_NOT_FOUND: &str = "Escrow payment not found";
    pub const ESCROW_NOT_HELD: &str = "Escrow payment is not held";
    pub const ESCROW_ALREADY_EXISTS: &str = "Engagement already has an escrow payment";
    pub const ESCROW_OPEN_DISPUTE: &str = "Escrow payment has an open dispute";
    pub const DISPUTE_NOT_FOUND: &str = "Dispute not found";
    pub const DISPUTE_ALREADY_RESOLVED: &str = "Dispute has already been resolved";
    pub const DISPUTE_ADMIN_ONLY: &str = "Only an admin may resolve a dispute";
    pub const DISPUTE_NOT_A_PARTY: &str = "Actor is not a party to this dispute";
}

/// The six error kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed input; the caller's fault.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The operation is not legal in the entity's current state.
    InvalidState,
    /// The operation would violate a uniqueness or single-winner invariant.
    Conflict,
    /// The external payment processor rejected the operation.
    PaymentFailed,
    /// The actor may not perform this operation.
    Permission,
}

impl ErrorKind {
    /// Machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::Conflict => "CONFLICT",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::Permission => "PERMISSION_DENIED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every engagement-core service operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity absent.
    #[error("{0}")]
    NotFound(String),

    /// Operation not legal in the current state.
    #[error("{0}")]
    InvalidState(String),

    /// Would violate a uniqueness or single-winner invariant.
    #[error("{0}")]
    Conflict(String),

    /// External processor rejected the operation. No record was written.
    #[error("{0}")]
    PaymentFailed(String),

    /// Actor not authorized for this transition.
    #[error("{0}")]
    Permission(String),
}

impl MarketError {
    /// The error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::PaymentFailed(_) => ErrorKind::PaymentFailed,
            Self::Permission(_) => ErrorKind::Permission,
        }
    }

    /// The user-visible message.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::NotFound(m)
            | Self::InvalidState(m)
            | Self::Conflict(m)
            | Self::PaymentFailed(m)
            | Self::Permission(m) => m,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn payment_failed(msg: impl Into<String>) -> Self {
        Self::PaymentFailed(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }
}

impl From<MoneyError> for MarketError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(err.to_string())
    }
}
