//! # Actors
//!
//! The callers that may drive state transitions. Authentication happens
//! outside the core; by the time an [`Actor`] reaches a service call its
//! identity and role have already been established.

use serde::{Deserialize, Serialize};

use crate::identity::ActorId;

/// The role an actor plays in a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The company that posted the talent request.
    Seeker,
    /// The company or individual behind the talent profile.
    Provider,
    /// A platform administrator.
    Admin,
    /// An automated caller such as a payment webhook or a sweeper job.
    System,
}

impl Role {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeker => "seeker",
            Self::Provider => "provider",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a two-party negotiation or dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The hiring company.
    Seeker,
    /// The talent provider.
    Provider,
}

impl Side {
    /// The opposite side.
    pub fn other(&self) -> Side {
        match self {
            Self::Seeker => Self::Provider,
            Self::Provider => Self::Seeker,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeker => "seeker",
            Self::Provider => "provider",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Who is calling.
    pub id: ActorId,
    /// In which capacity.
    pub role: Role,
}

impl Actor {
    /// A seeker-side actor.
    pub fn seeker(id: ActorId) -> Self {
        Self {
            id,
            role: Role::Seeker,
        }
    }

    /// A provider-side actor.
    pub fn provider(id: ActorId) -> Self {
        Self {
            id,
            role: Role::Provider,
        }
    }

    /// A platform administrator.
    pub fn admin(id: ActorId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    /// An automated system caller.
    pub fn system() -> Self {
        Self {
            id: ActorId::from_uuid(uuid::Uuid::nil()),
            role: Role::System,
        }
    }

    /// Whether this actor is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The negotiation side this actor speaks for, if any.
    pub fn side(&self) -> Option<Side> {
        match self.role {
            Role::Seeker => Some(Side::Seeker),
            Role::Provider => Some(Side::Provider),
            Role::Admin | Role::System => None,
        }
    }

    /// Whether this actor is the given party acting on its own side.
    pub fn is_party(&self, side: Side, party_id: ActorId) -> bool {
        self.side() == Some(side) && self.id == party_id
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.role, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_mapping() {
        let id = ActorId::new();
        assert_eq!(Actor::seeker(id).side(), Some(Side::Seeker));
        assert_eq!(Actor::provider(id).side(), Some(Side::Provider));
        assert_eq!(Actor::admin(id).side(), None);
        assert_eq!(Actor::system().side(), None);
    }

    #[test]
    fn is_party_requires_matching_side_and_id() {
        let id = ActorId::new();
        assert!(Actor::seeker(id).is_party(Side::Seeker, id));
        assert!(!Actor::seeker(id).is_party(Side::Provider, id));
        assert!(!Actor::seeker(ActorId::new()).is_party(Side::Seeker, id));
        assert!(!Actor::admin(id).is_party(Side::Seeker, id));
    }

    #[test]
    fn other_side_flips() {
        assert_eq!(Side::Seeker.other(), Side::Provider);
        assert_eq!(Side::Provider.other(), Side::Seeker);
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
