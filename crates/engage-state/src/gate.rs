//! Contract gate between offer acceptance and engagement creation.
//!
//! The signature flag comes from the contract service. Any failure to
//! obtain it is passed in as `None` and keeps the gate closed.

use crate::error::TransitionError;
use crate::offer::{Offer, OfferStatus};

/// True only for an accepted offer whose contract is known to be fully signed.
pub fn can_activate(offer: &Offer, signature: Option<bool>) -> bool {
    offer.status == OfferStatus::Accepted && signature == Some(true)
}

/// [`can_activate`] as a `Result`.
pub fn ensure_can_activate(offer: &Offer, signature: Option<bool>) -> Result<(), TransitionError> {
    if can_activate(offer, signature) {
        Ok(())
    } else {
        Err(TransitionError::ContractNotSigned {
            offer: offer.id.to_string(),
        })
    }
}
