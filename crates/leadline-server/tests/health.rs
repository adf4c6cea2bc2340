use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use leadline_db::{create_pool, run_migrations, DbRuntimeSettings};
use leadline_leads::{DeliveryError, LeadApi, LeadSubmission, LeadSubmitter};
use leadline_server::{app, AppState};
use leadline_voice::{EngineConnection, EngineError, EngineSession, SpeechEngine};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct NoEngine;

#[async_trait]
impl SpeechEngine for NoEngine {
    async fn connect(&self, _session: EngineSession) -> Result<EngineConnection, EngineError> {
        Err(EngineError::Closed)
    }
}

struct NoApi;

#[async_trait]
impl LeadApi for NoApi {
    async fn create_lead(&self, _submission: &LeadSubmission) -> Result<String, DeliveryError> {
        Err(DeliveryError::NotConfigured("test"))
    }
}

fn state() -> AppState {
    let pool = create_pool(":memory:", DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();
    AppState {
        pool: pool.clone(),
        engine: Arc::new(NoEngine),
        submitter: LeadSubmitter::new(pool, Arc::new(NoApi)),
        bridge: Arc::new(Default::default()),
    }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let response = app(state())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn stream_endpoint_requires_a_websocket_upgrade() {
    let response = app(state())
        .oneshot(
            Request::builder()
                .uri("/twilio/voice/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
