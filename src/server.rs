//! HTTP API for the dashboard.
//!
//! Read-mostly surface over the shared state store:
//! - `GET /health` — liveness and version
//! - `GET /current-detection` — the live detection snapshot
//! - `GET /alerts` — alert history, newest first
//! - `POST /alerts/:id/read` — mark one alert read
//! - `DELETE /alerts` — clear the history
//! - `GET /stats` — sensing loop counters
//!
//! Handlers never block the sensing loop beyond the store's bounded
//! critical sections.

use crate::core::{Alert, DetectionSnapshot};
use crate::processor::{ProcessorStats, StatsSnapshot};
use crate::store::SharedStateStore;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Dashboard origin allowed by CORS
    pub dashboard_origin: String,
}

impl ServerConfig {
    pub fn new(port: u16, dashboard_origin: impl Into<String>) -> Self {
        Self {
            port,
            dashboard_origin: dashboard_origin.into(),
        }
    }
}

/// Shared server state.
struct ApiState {
    store: SharedStateStore,
    stats: Arc<ProcessorStats>,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Generic status response.
#[derive(Serialize)]
struct StatusResponse {
    status: String,
}

/// Error response.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /current-detection
async fn current_detection(State(state): State<Arc<ApiState>>) -> Json<DetectionSnapshot> {
    Json(state.store.snapshot())
}

/// GET /alerts — newest first
async fn list_alerts(State(state): State<Arc<ApiState>>) -> Json<Vec<Alert>> {
    Json(state.store.alerts())
}

/// POST /alerts/:id/read
async fn mark_alert_read(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    if state.store.mark_read(id) {
        Ok(Json(StatusResponse {
            status: "ok".to_string(),
        }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No alert with id {id}"),
                code: "ALERT_NOT_FOUND".to_string(),
            }),
        ))
    }
}

/// DELETE /alerts
async fn clear_alerts(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    state.store.clear_alerts();
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// GET /stats
async fn loop_stats(State(state): State<Arc<ApiState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Run the HTTP server.
///
/// Returns the bound address and a shutdown sender; the server itself
/// runs on a spawned task until the sender fires.
pub async fn run(
    config: ServerConfig,
    store: SharedStateStore,
    stats: Arc<ProcessorStats>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ApiState { store, stats });

    let origin = config
        .dashboard_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:8080"));

    let app = Router::new()
        .route("/health", get(health))
        .route("/current-detection", get(current_detection))
        .route("/alerts", get(list_alerts).delete(clear_alerts))
        .route("/alerts/:id/read", post(mark_alert_read))
        .route("/stats", get(loop_stats))
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("dashboard API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("server shutdown signal received");
            })
            .await
        {
            tracing::error!("server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
