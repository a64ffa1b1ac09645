//! # Offer Negotiation
//!
//! Routes:
//! - POST   /v1/offers — Make an offer on a request for a profile
//! - GET    /v1/offers/{id} — Get an offer
//! - POST   /v1/offers/{id}/respond — Accept, reject or counter
//! - GET    /v1/requests/{id}/offers — Offers on a request, oldest first
//! - POST   /v1/offers/expire — Expire every lapsed pending offer (admin)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use engage_core::{Currency, MarketError, OfferId, ProfileId, RequestId, Timestamp};
use engage_engine::OfferResponse;
use engage_state::{Offer, OfferAction, OfferTerms};

use crate::error::AppError;
use crate::extractors::{parse_id, RequestActor};
use crate::routes::blocking;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOfferBody {
    pub request_id: RequestId,
    pub profile_id: ProfileId,
    pub hourly_rate: i64,
    pub duration_hours: u32,
    pub currency: Option<Currency>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpiredOffers {
    pub expired: Vec<OfferId>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/offers", post(create_offer))
        .route("/v1/offers/expire", post(expire_stale))
        .route("/v1/offers/{id}", get(get_offer))
        .route("/v1/offers/{id}/respond", post(respond))
        .route("/v1/requests/{id}/offers", get(list_for_request))
}

async fn create_offer(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<CreateOfferBody>,
) -> Result<(StatusCode, Json<Offer>), AppError> {
    let terms = OfferTerms {
        hourly_rate: body.hourly_rate,
        duration_hours: body.duration_hours,
        currency: body
            .currency
            .unwrap_or_else(|| state.market.config().currency.clone()),
        message: body.message,
    };
    let offer = blocking(move || {
        state
            .market
            .offers()
            .create_offer(body.request_id, body.profile_id, terms, actor)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Offer>, AppError> {
    let id: OfferId = parse_id("offer_id", &id)?;
    Ok(Json(state.market.offers().get(id)?))
}

async fn respond(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(action): Json<OfferAction>,
) -> Result<Json<OfferResponse>, AppError> {
    let id: OfferId = parse_id("offer_id", &id)?;
    let response = blocking(move || state.market.offers().respond(id, action, actor)).await?;
    Ok(Json(response))
}

async fn list_for_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Offer>>, AppError> {
    let id: RequestId = parse_id("request_id", &id)?;
    // Surface a missing request as 404 rather than an empty list.
    state.market.talent().request(id)?;
    Ok(Json(state.market.offers().for_request(id)))
}

async fn expire_stale(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<Json<ExpiredOffers>, AppError> {
    if !actor.is_admin() {
        return Err(MarketError::permission("Only an admin may sweep offers").into());
    }
    let expired =
        blocking(move || Ok(state.market.offers().expire_stale(Timestamp::now()))).await?;
    Ok(Json(ExpiredOffers { expired }))
}
