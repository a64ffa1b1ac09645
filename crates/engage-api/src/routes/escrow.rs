//! # Escrow Payments
//!
//! Routes:
//! - GET    /v1/escrows/{id} — Get an escrow payment
//! - POST   /v1/escrows/{id}/release — Release to the provider (party or admin)
//! - GET    /v1/escrows/due — Held escrows past their hold period (admin)
//! - POST   /v1/webhooks/payments/release — Processor-driven release
//!
//! The webhook acts as the system actor. When a webhook secret is
//! configured the call must carry it in `x-webhook-secret`. Replayed
//! webhooks are harmless: a second release returns the released escrow
//! without another transfer.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use engage_arbitration::EscrowPayment;
use engage_core::{Actor, EscrowId, MarketError, Timestamp};

use crate::error::AppError;
use crate::extractors::{constant_time_token_eq, parse_id, RequestActor};
use crate::routes::blocking;
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Deserialize)]
pub struct ReleaseWebhookBody {
    pub escrow_id: EscrowId,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/escrows/due", get(due_for_release))
        .route("/v1/escrows/{id}", get(get_escrow))
        .route("/v1/escrows/{id}/release", post(release))
        .route("/v1/webhooks/payments/release", post(release_webhook))
}

async fn get_escrow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EscrowPayment>, AppError> {
    let id: EscrowId = parse_id("escrow_id", &id)?;
    Ok(Json(state.market.ledger().get(id)?))
}

async fn release(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<Json<EscrowPayment>, AppError> {
    let id: EscrowId = parse_id("escrow_id", &id)?;
    run_release(state, id, actor).await
}

async fn release_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReleaseWebhookBody>,
) -> Result<Json<EscrowPayment>, AppError> {
    if let Some(expected) = state.config.webhook_secret.as_deref() {
        let presented = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !constant_time_token_eq(presented, expected) {
            return Err(AppError::Unauthorized("invalid webhook secret".into()));
        }
    }
    tracing::info!(escrow_id = %body.escrow_id, "release webhook received");
    run_release(state, body.escrow_id, Actor::system()).await
}

async fn run_release(
    state: AppState,
    id: EscrowId,
    actor: Actor,
) -> Result<Json<EscrowPayment>, AppError> {
    let escrow = blocking(move || state.market.ledger().release(id, actor)).await?;
    Ok(Json(escrow))
}

async fn due_for_release(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<Json<Vec<EscrowPayment>>, AppError> {
    if !actor.is_admin() {
        return Err(MarketError::permission("Only an admin may list due escrows").into());
    }
    Ok(Json(state.market.ledger().held_past(Timestamp::now())))
}
