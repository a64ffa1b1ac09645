//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are merged into the application in [`crate::app`].

pub mod audit;
pub mod disputes;
pub mod engagements;
pub mod escrow;
pub mod offers;
pub mod talent;

use engage_core::MarketError;

use crate::error::AppError;

/// Run an engine call on the blocking pool.
///
/// Every engine operation that takes a keyed lock goes through here. A lock
/// may be held across a slow processor call, and waiting on it must not
/// stall an async worker.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, MarketError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}
