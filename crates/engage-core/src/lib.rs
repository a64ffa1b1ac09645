//! # engage-core — Foundational Types for the Engagement Core
//!
//! Every other crate in the workspace depends on `engage-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `RequestId`, `ProfileId`, `OfferId`,
//!    `EngagementId`, `EscrowId`, `DisputeId`, `ActorId` are distinct types.
//!    You cannot pass an `OfferId` where an `EscrowId` is expected.
//!
//! 2. **Integer money.** Amounts are `i64` minor units. The platform fee is
//!    computed once with basis-point arithmetic and the provider share is
//!    always `amount - fee`, so the two always sum to the original amount.
//!
//! 3. **One status vocabulary per entity.** Each lifecycle enum implements
//!    [`Lifecycle`], whose `valid_transitions()` is the single transition
//!    table for that entity.
//!
//! 4. **One error taxonomy.** [`MarketError`] carries the six error kinds
//!    surfaced to callers. Its `Display` output is the user-visible message.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `engage-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod actor;
pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;
pub mod transition;

pub use actor::{Actor, Role, Side};
pub use error::{messages, ErrorKind, MarketError};
pub use identity::{ActorId, DisputeId, EngagementId, EscrowId, OfferId, ProfileId, RequestId};
pub use money::{Currency, FeePolicy, FeeSplit, Money, MoneyError};
pub use temporal::Timestamp;
pub use transition::{AuditEntry, EntityKind, Lifecycle, TransitionRecord};
