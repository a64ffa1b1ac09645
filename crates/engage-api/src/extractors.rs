//! # Custom Extractors
//!
//! Caller identity and typed path identifiers.
//!
//! Authentication happens in front of this service. The gateway forwards
//! the authenticated caller as `x-actor-id` (UUID) and `x-actor-role`
//! (`seeker`, `provider` or `admin`). The `system` role is never accepted
//! from a header; only the payment webhook acts as the system.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use engage_core::{Actor, ActorId, Role};

use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct RequestActor(pub Actor);

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))
        };
        let id = Uuid::parse_str(header(ACTOR_ID_HEADER)?)
            .map_err(|_| AppError::Unauthorized(format!("malformed {ACTOR_ID_HEADER} header")))?;
        let role = parse_role(header(ACTOR_ROLE_HEADER)?)?;
        Ok(Self(Actor {
            id: ActorId::from_uuid(id),
            role,
        }))
    }
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "seeker" => Ok(Role::Seeker),
        "provider" => Ok(Role::Provider),
        "admin" => Ok(Role::Admin),
        other => Err(AppError::Unauthorized(format!("unsupported actor role '{other}'"))),
    }
}

/// Parse a path segment as an identifier of type `T`.
pub fn parse_id<T: From<Uuid>>(field: &str, raw: &str) -> Result<T, AppError> {
    Uuid::parse_str(raw)
        .map(T::from)
        .map_err(|_| AppError::invalid_field(field, format!("{field} is not a valid UUID")))
}

/// Constant-time comparison of shared secrets.
///
/// On a length mismatch a dummy comparison still runs so the rejection
/// takes about as long as a full compare.
pub fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use engage_core::OfferId;

    async fn extract(headers: &[(&str, &str)]) -> Result<RequestActor, AppError> {
        let mut builder = Request::builder().uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        RequestActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_actor_from_headers() {
        let id = Uuid::new_v4();
        let actor = extract(&[
            (ACTOR_ID_HEADER, id.to_string().as_str()),
            (ACTOR_ROLE_HEADER, "Provider"),
        ])
        .await
        .unwrap();
        assert_eq!(actor.0, Actor::provider(ActorId::from_uuid(id)));
    }

    #[tokio::test]
    async fn rejects_missing_or_system_role() {
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            extract(&[(ACTOR_ID_HEADER, id.as_str())]).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&[(ACTOR_ID_HEADER, id.as_str()), (ACTOR_ROLE_HEADER, "system")]).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&[(ACTOR_ID_HEADER, "nope"), (ACTOR_ROLE_HEADER, "admin")]).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn constant_time_eq_identical_secrets() {
        assert!(constant_time_token_eq("whsec-4f9a", "whsec-4f9a"));
    }

    #[test]
    fn constant_time_eq_rejects_wrong_secret() {
        assert!(!constant_time_token_eq("whsec-4f9b", "whsec-4f9a"));
    }

    #[test]
    fn constant_time_eq_rejects_prefix_and_empty() {
        assert!(!constant_time_token_eq("whsec", "whsec-4f9a"));
        assert!(!constant_time_token_eq("", "whsec-4f9a"));
    }

    #[test]
    fn parse_id_reports_field() {
        assert!(parse_id::<OfferId>("offer_id", &Uuid::new_v4().to_string()).is_ok());
        match parse_id::<OfferId>("offer_id", "12") {
            Err(AppError::BadRequest { details, .. }) => {
                assert_eq!(details.unwrap()["field"], "offer_id")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
