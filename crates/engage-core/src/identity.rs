//! # Identity Newtypes
//!
//! UUID-backed identifiers for every entity in the engagement core. Each
//! identifier is a distinct type and is always valid by construction.
//!
//! Identifiers order by their UUID so that ranked output (match results,
//! listings) can use them as a stable tie-break.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Defines a UUID newtype with the constructor, accessor, `Default`,
/// `From<Uuid>`, and prefixed `Display` implementations shared by every
/// identifier in this module.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $ty:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_identifier!(
    /// A talent request posted by a seeker company.
    RequestId,
    "request"
);

uuid_identifier!(
    /// A talent profile submitted by a provider.
    ProfileId,
    "profile"
);

uuid_identifier!(
    /// An offer negotiated between a seeker and a provider.
    OfferId,
    "offer"
);

uuid_identifier!(
    /// An engagement created from an accepted offer.
    EngagementId,
    "engagement"
);

uuid_identifier!(
    /// An escrow payment captured for an engagement.
    EscrowId,
    "escrow"
);

uuid_identifier!(
    /// A dispute raised against an escrow payment.
    DisputeId,
    "dispute"
);

uuid_identifier!(
    /// A seeker company, provider, or platform administrator.
    ActorId,
    "actor"
);
