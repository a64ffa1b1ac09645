//! # engage-api — Axum HTTP Surface for the Engagement Core
//!
//! A thin layer over [`engage_engine::Marketplace`]. Handlers parse the
//! request, call one service operation and serialize the result; no
//! business rules live here.
//!
//! ## API Surface
//!
//! | Prefix                    | Module                   |
//! |---------------------------|--------------------------|
//! | `/v1/requests/*`          | [`routes::talent`], [`routes::offers`] |
//! | `/v1/profiles/*`          | [`routes::talent`]       |
//! | `/v1/offers/*`            | [`routes::offers`]       |
//! | `/v1/engagements/*`       | [`routes::engagements`]  |
//! | `/v1/escrows/*`           | [`routes::escrow`]       |
//! | `/v1/webhooks/payments/*` | [`routes::escrow`]       |
//! | `/v1/disputes/*`          | [`routes::disputes`]     |
//! | `/v1/audit/*`             | [`routes::audit`]        |
//! | `/health/*`               | liveness and readiness   |
//!
//! Errors use the body `{"error": {"code", "message", "details"}}`; see
//! [`error::AppError`].

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{ApiConfig, AppState, LogFormat};

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::talent::router())
        .merge(routes::offers::router())
        .merge(routes::engagements::router())
        .merge(routes::escrow::router())
        .merge(routes::disputes::router())
        .merge(routes::audit::router())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
