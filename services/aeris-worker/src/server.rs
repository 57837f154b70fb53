//! Status/health HTTP surface for operators: a small `Extension`-backed
//! router with `/health` and `/status`, not a user-facing API.

use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::{AppState, TaskRunRecord};

#[derive(Debug, Serialize)]
struct StatusResponse {
    service: String,
    status: String,
    feature_flags: FeatureFlagsResponse,
    last_task_runs: Vec<TaskRunResponse>,
}

#[derive(Debug, Serialize)]
struct FeatureFlagsResponse {
    persist_pollution_grid: bool,
    upes_enabled: bool,
    route_optimization_enabled: bool,
    alerts_enabled: bool,
}

#[derive(Debug, Serialize)]
struct TaskRunResponse {
    task: String,
    ran_at: String,
    outcome: String,
}

impl From<TaskRunRecord> for TaskRunResponse {
    fn from(r: TaskRunRecord) -> Self {
        Self {
            task: r.task,
            ran_at: r.ran_at.to_rfc3339(),
            outcome: r.outcome,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(cors)
        .layer(Extension(state))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "aeris-worker" }))
}

async fn status_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let flags = state.config.features;
    let mut runs: Vec<TaskRunResponse> = state.task_snapshot().await.into_iter().map(Into::into).collect();
    runs.sort_by(|a, b| a.task.cmp(&b.task));

    Json(StatusResponse {
        service: "aeris-worker".to_string(),
        status: "running".to_string(),
        feature_flags: FeatureFlagsResponse {
            persist_pollution_grid: flags.persist_pollution_grid,
            upes_enabled: flags.upes_enabled,
            route_optimization_enabled: flags.route_optimization_enabled,
            alerts_enabled: flags.alerts_enabled,
        },
        last_task_runs: runs,
    })
}

/// Start the status HTTP server.
pub async fn run_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "starting aeris-worker status server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
