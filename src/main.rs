//! ScamLens engine — multi-signal risk scoring for fraud checks.
//!
//! Turns a submitted artifact (URL or product listing) into a bounded,
//! explainable safety verdict by joining static heuristics, an external
//! reputation lookup and a panel of AI judges.
//!
//! ## Endpoints
//!
//! - `GET  /health`           — Health check
//! - `POST /scan/link`        — Score a URL
//! - `POST /scan/product`     — Score a product listing
//! - `GET  /quota/{caller}`   — Remaining scan allowance

mod error;
mod handlers;
mod heuristics;
mod judges;
mod models;
mod pipeline;
mod quota;
mod reputation;
mod scoring;
mod state;
mod store;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use state::AppState;

/// Build the engine's router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/scan/link", post(handlers::scan_link))
        .route("/scan/product", post(handlers::scan_product))
        .route("/quota/:caller", get(handlers::quota_view))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "scamlens=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::from_env()?);

    let app = router(state);

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3200".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ScamLens engine listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
