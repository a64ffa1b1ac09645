//! # Disputes
//!
//! Routes:
//! - POST   /v1/disputes — Raise a dispute against a held escrow
//! - GET    /v1/disputes/{id} — Get a dispute
//! - POST   /v1/disputes/{id}/review — OPEN → UNDER_REVIEW
//! - POST   /v1/disputes/{id}/escalate — UNDER_REVIEW → ADMIN_REVIEW
//! - POST   /v1/disputes/{id}/evidence — Append a party's evidence
//! - POST   /v1/disputes/{id}/resolve — Admin decision

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use engage_arbitration::{AdminDecision, Dispute};
use engage_core::{DisputeId, EscrowId};
use engage_engine::DisputeOutcome;

use crate::error::AppError;
use crate::extractors::{parse_id, RequestActor};
use crate::routes::blocking;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EvidenceBody {
    pub description: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct CreateDisputeBody {
    pub escrow_id: EscrowId,
    pub reason: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceBody>,
}

#[derive(Debug, Deserialize)]
pub struct EscalateBody {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/disputes", post(create_dispute))
        .route("/v1/disputes/{id}", get(get_dispute))
        .route("/v1/disputes/{id}/review", post(begin_review))
        .route("/v1/disputes/{id}/escalate", post(escalate))
        .route("/v1/disputes/{id}/evidence", post(add_evidence))
        .route("/v1/disputes/{id}/resolve", post(resolve))
}

async fn create_dispute(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<CreateDisputeBody>,
) -> Result<(StatusCode, Json<Dispute>), AppError> {
    let evidence = body
        .evidence
        .into_iter()
        .map(|e| (e.description, e.payload))
        .collect();
    let dispute = blocking(move || {
        state
            .market
            .disputes()
            .create_dispute(body.escrow_id, body.reason, evidence, actor)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(dispute)))
}

async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Dispute>, AppError> {
    let id: DisputeId = parse_id("dispute_id", &id)?;
    Ok(Json(state.market.disputes().get(id)?))
}

async fn begin_review(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<Json<Dispute>, AppError> {
    let id: DisputeId = parse_id("dispute_id", &id)?;
    let dispute = blocking(move || state.market.disputes().begin_review(id, actor)).await?;
    Ok(Json(dispute))
}

async fn escalate(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(body): Json<EscalateBody>,
) -> Result<Json<Dispute>, AppError> {
    let id: DisputeId = parse_id("dispute_id", &id)?;
    let dispute =
        blocking(move || state.market.disputes().escalate(id, actor, body.reason)).await?;
    Ok(Json(dispute))
}

async fn add_evidence(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(body): Json<EvidenceBody>,
) -> Result<Json<Dispute>, AppError> {
    let id: DisputeId = parse_id("dispute_id", &id)?;
    let dispute = blocking(move || {
        state
            .market
            .disputes()
            .add_evidence(id, actor, body.description, body.payload)
    })
    .await?;
    Ok(Json(dispute))
}

async fn resolve(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(decision): Json<AdminDecision>,
) -> Result<Json<DisputeOutcome>, AppError> {
    let id: DisputeId = parse_id("dispute_id", &id)?;
    let outcome = blocking(move || state.market.disputes().resolve(id, decision, actor)).await?;
    Ok(Json(outcome))
}
