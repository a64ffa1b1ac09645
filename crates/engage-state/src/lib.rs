//! # engage-state — Negotiation and Engagement State Machines
//!
//! - **Offer** (`offer.rs`): `Pending → Accepted | Rejected | Expired`, with
//!   a bounded counter loop through `Countered`.
//! - **Contract gate** (`gate.rs`): an offer may become an engagement only
//!   when it is accepted and its contract is fully signed.
//! - **Engagement** (`engagement.rs`): `Staged → Interviewing → Accepted →
//!   Active → Completed`, with `Rejected`, `Terminated` and `Disputed`
//!   branches.
//!
//! The machines are plain enums checked against their
//! [`Lifecycle`](engage_core::Lifecycle) table at runtime. They hold no
//! locks and perform no I/O; `engage-engine` owns persistence and
//! serialization.

pub mod engagement;
pub mod error;
pub mod gate;
pub mod offer;

pub use engagement::{Engagement, EngagementStatus};
pub use error::TransitionError;
pub use gate::{can_activate, ensure_can_activate};
pub use offer::{
    CounterTerms, NegotiationPolicy, Offer, OfferAction, OfferStatus, OfferTerms, ResponseOutcome,
};
