//! # engage-arbitration — Escrow and Disputes
//!
//! - **Escrow** ([`escrow`]): held funds for an engagement, with the fee
//!   split fixed at capture, release preconditions, and refund planning.
//! - **Dispute** ([`dispute`]): `open → under_review → admin_review →
//!   resolved`, admin-only resolution via [`AdminDecision`].
//! - **Evidence** ([`evidence`]): append-only evidence bag.
//!
//! Records here never call the payment processor. The engine checks a
//! precondition, performs the external call, then applies the receipt.

pub mod dispute;
pub mod error;
pub mod escrow;
pub mod evidence;

pub use dispute::{AdminDecision, Dispute, DisputeStatus, Resolution};
pub use error::ArbitrationError;
pub use escrow::{
    EscrowPayment, EscrowStatus, EscrowTransaction, Receipt, RefundPlan, ReleaseCheck,
    TransactionKind,
};
pub use evidence::{EvidenceBag, EvidenceItem, EvidenceSource};
