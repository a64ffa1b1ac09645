//! # Engagements
//!
//! Routes:
//! - POST   /v1/engagements — Stage an engagement from an accepted offer
//! - GET    /v1/engagements/{id} — Get an engagement
//! - POST   /v1/engagements/{id}/transition — Move along the lifecycle
//! - POST   /v1/engagements/{id}/activate — Capture escrow and activate
//! - POST   /v1/engagements/{id}/confirm-completion — Record a party's confirmation

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use engage_core::{EngagementId, OfferId};
use engage_state::{Engagement, EngagementStatus};

use crate::error::AppError;
use crate::extractors::{parse_id, RequestActor};
use crate::routes::blocking;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEngagementBody {
    pub offer_id: OfferId,
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub status: EngagementStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateBody {
    /// Processor reference for the seeker's payment method.
    pub payment_method_ref: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/engagements", post(create_engagement))
        .route("/v1/engagements/{id}", get(get_engagement))
        .route("/v1/engagements/{id}/transition", post(transition))
        .route("/v1/engagements/{id}/activate", post(activate))
        .route("/v1/engagements/{id}/confirm-completion", post(confirm_completion))
}

async fn create_engagement(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<CreateEngagementBody>,
) -> Result<(StatusCode, Json<Engagement>), AppError> {
    let engagement =
        blocking(move || state.market.engagements().create_engagement(body.offer_id, actor))
            .await?;
    Ok((StatusCode::CREATED, Json(engagement)))
}

async fn get_engagement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Engagement>, AppError> {
    let id: EngagementId = parse_id("engagement_id", &id)?;
    Ok(Json(state.market.engagements().get(id)?))
}

async fn transition(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Engagement>, AppError> {
    let id: EngagementId = parse_id("engagement_id", &id)?;
    let engagement = blocking(move || {
        state
            .market
            .engagements()
            .transition(id, body.status, actor, body.reason)
    })
    .await?;
    Ok(Json(engagement))
}

async fn activate(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(body): Json<ActivateBody>,
) -> Result<Json<Engagement>, AppError> {
    let id: EngagementId = parse_id("engagement_id", &id)?;
    let engagement = blocking(move || {
        state
            .market
            .engagements()
            .activate(id, actor, &body.payment_method_ref)
    })
    .await?;
    Ok(Json(engagement))
}

async fn confirm_completion(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<Json<Engagement>, AppError> {
    let id: EngagementId = parse_id("engagement_id", &id)?;
    let engagement =
        blocking(move || state.market.engagements().confirm_completion(id, actor)).await?;
    Ok(Json(engagement))
}
