//! Leadline server binary.
//!
//! Starts an axum HTTP server with structured logging, database
//! initialization, and graceful shutdown on SIGTERM/SIGINT.

use leadline_leads::{LeadSubmitter, NpaClient};
use leadline_server::config::{load_config, resolve_config_path};
use leadline_server::{app, AppState};
use leadline_voice::RealtimeEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path(std::env::args().nth(1));
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "using config file"
    );

    // Initialize database
    let pool = leadline_db::create_pool(&config.database.path, config.database.runtime_settings())
        .expect("failed to create database pool; check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            leadline_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    if config.engine.api_key.is_empty() {
        tracing::warn!("engine.api_key is not set; calls will fail to reach the speech engine");
    }
    if !config.lead_api.is_configured() {
        tracing::warn!("lead_api is not configured; accepted leads will land in the failed ledger");
    }

    let lead_api = NpaClient::new(config.lead_api.clone()).expect("failed to build lead API client");
    let state = AppState {
        pool: pool.clone(),
        engine: Arc::new(RealtimeEngine::new(config.engine.clone())),
        submitter: LeadSubmitter::new(pool, Arc::new(lead_api)),
        bridge: Arc::new(config.bridge.clone()),
    };

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting leadline server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // New calls are refused once a shutdown signal arrives.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("leadline server shut down");
}

/// Resolves on the first of Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, shutting down; in-flight calls are dropped"); }
        () = terminate => { tracing::info!("received SIGTERM, shutting down; in-flight calls are dropped"); }
    }
}
