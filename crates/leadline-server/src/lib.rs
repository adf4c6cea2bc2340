//! Leadline server library logic.

pub mod api_stream;
pub mod bridge;
pub mod config;
pub mod script;

use axum::{routing::get, Extension, Json, Router};
use config::BridgeConfig;
use leadline_db::DbPool;
use leadline_leads::LeadSubmitter;
use leadline_voice::SpeechEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Opens one speech-engine session per call.
    pub engine: Arc<dyn SpeechEngine>,
    /// Runs eligibility and delivery, and records the ledger entry.
    pub submitter: LeadSubmitter,
    pub bridge: Arc<BridgeConfig>,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/twilio/voice/stream",
            get(api_stream::voice_stream_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
