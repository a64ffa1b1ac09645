//! # Audit Journal
//!
//! Routes:
//! - GET    /v1/audit/{entity_id} — Every recorded transition of one entity (admin)

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use engage_core::{AuditEntry, MarketError};

use crate::error::AppError;
use crate::extractors::{parse_id, RequestActor};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit/{entity_id}", get(entity_history))
}

async fn entity_history(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path(entity_id): Path<String>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    if !actor.is_admin() {
        return Err(MarketError::permission("Only an admin may read the audit journal").into());
    }
    let entity_id: Uuid = parse_id("entity_id", &entity_id)?;
    Ok(Json(state.market.journal().for_entity(entity_id)))
}
