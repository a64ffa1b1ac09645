//! # Talent Requests and Profiles
//!
//! Routes:
//! - POST   /v1/requests — Submit a talent request (seeker)
//! - GET    /v1/requests/{id} — Get a request
//! - GET    /v1/requests/{id}/matches?limit=N — Ranked candidates
//! - POST   /v1/requests/{id}/close — Close a request (owning seeker or admin)
//! - POST   /v1/profiles — Register a talent profile (provider)
//! - GET    /v1/profiles/{id} — Get a profile
//! - PUT    /v1/profiles/{id}/availability — Change availability

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use engage_core::{Currency, MarketError, ProfileId, RequestId, Role};
use engage_matching::{
    Availability, ExperienceLevel, MatchResult, ProfileSkill, RateRange, RequiredSkill,
    TalentProfile, TalentRequest, Urgency,
};

use crate::error::AppError;
use crate::extractors::{parse_id, RequestActor};
use crate::routes::blocking;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub title: String,
    /// Absent means the request carries no skills section and cannot be
    /// matched until it is resubmitted.
    pub skills_required: Option<Vec<RequiredSkill>>,
    pub budget_min: i64,
    pub budget_max: i64,
    /// Defaults to the marketplace currency.
    pub currency: Option<Currency>,
    #[serde(default)]
    pub duration_hours: u32,
    pub urgency: Option<Urgency>,
    pub experience_level: ExperienceLevel,
    pub location: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterProfileBody {
    pub display_name: String,
    pub skills: Vec<ProfileSkill>,
    pub experience_level: ExperienceLevel,
    pub rate_min: Option<i64>,
    pub rate_max: Option<i64>,
    pub availability: Option<Availability>,
    pub location: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    pub availability: Availability,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CloseBody {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/requests", post(submit_request))
        .route("/v1/requests/{id}", get(get_request))
        .route("/v1/requests/{id}/matches", get(match_candidates))
        .route("/v1/requests/{id}/close", post(close_request))
        .route("/v1/profiles", post(register_profile))
        .route("/v1/profiles/{id}", get(get_profile))
        .route("/v1/profiles/{id}/availability", put(set_availability))
}

fn rate_range(field: &str, min: i64, max: i64) -> Result<RateRange, AppError> {
    RateRange::new(min, max).map_err(|e| AppError::invalid_field(field, e.to_string()))
}

async fn submit_request(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<TalentRequest>), AppError> {
    if actor.role != Role::Seeker {
        return Err(MarketError::permission("Only a seeker may submit a talent request").into());
    }
    let budget = rate_range("budget", body.budget_min, body.budget_max)?;
    let mut request = TalentRequest::new(
        actor.id,
        body.title,
        Vec::new(),
        budget,
        body.experience_level,
    );
    request.skills_required = body.skills_required;
    request.currency = body
        .currency
        .unwrap_or_else(|| state.market.config().currency.clone());
    request.duration_hours = body.duration_hours;
    request.urgency = body.urgency.unwrap_or(request.urgency);
    request.location = body.location;
    request.timezone = body.timezone;

    let request = state.market.talent().submit_request(request)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TalentRequest>, AppError> {
    let id: RequestId = parse_id("request_id", &id)?;
    Ok(Json(state.market.talent().request(id)?))
}

async fn match_candidates(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<Vec<MatchResult>>, AppError> {
    let id: RequestId = parse_id("request_id", &id)?;
    Ok(Json(state.market.talent().match_candidates(id, query.limit)?))
}

async fn close_request(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(body): Json<CloseBody>,
) -> Result<Json<TalentRequest>, AppError> {
    let id: RequestId = parse_id("request_id", &id)?;
    let request =
        blocking(move || state.market.offers().close_request(id, actor, body.reason)).await?;
    Ok(Json(request))
}

async fn register_profile(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Json(body): Json<RegisterProfileBody>,
) -> Result<(StatusCode, Json<TalentProfile>), AppError> {
    if actor.role != Role::Provider {
        return Err(MarketError::permission("Only a provider may register a profile").into());
    }
    let mut profile = TalentProfile::new(
        actor.id,
        body.display_name,
        body.skills,
        body.experience_level,
    );
    profile.hourly_rate = match (body.rate_min, body.rate_max) {
        (Some(min), Some(max)) => Some(rate_range("rate", min, max)?),
        (None, None) => None,
        _ => {
            return Err(AppError::invalid_field(
                "rate",
                "rate_min and rate_max must be given together",
            ))
        }
    };
    if let Some(availability) = body.availability {
        profile.availability = availability;
    }
    profile.location = body.location;
    profile.timezone = body.timezone;

    let profile = state.market.talent().register_profile(profile)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TalentProfile>, AppError> {
    let id: ProfileId = parse_id("profile_id", &id)?;
    Ok(Json(state.market.talent().profile(id)?))
}

async fn set_availability(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<TalentProfile>, AppError> {
    let id: ProfileId = parse_id("profile_id", &id)?;
    Ok(Json(
        state
            .market
            .talent()
            .set_availability(id, body.availability, actor)?,
    ))
}
