//! # engage-api — Binary Entry Point
//!
//! Starts the Axum HTTP server over an in-memory marketplace.
//! Binds to `ENGAGE_API_PORT` (default 8080).

use anyhow::Context;
use engage_api::{ApiConfig, AppState, LogFormat};
use engage_engine::{EngineConfig, Marketplace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("reading server configuration")?;
    init_tracing(config.log_format);

    let engine = EngineConfig::from_env().context("reading engine configuration")?;
    let market = Marketplace::in_memory(engine);
    if config.webhook_secret.is_none() {
        tracing::warn!("ENGAGE_WEBHOOK_SECRET not set; release webhook accepts unsigned calls");
    }

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = engage_api::app(AppState::with_market(market, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "engage API listening");
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
