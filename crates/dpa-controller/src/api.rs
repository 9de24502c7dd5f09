//! HTTP API for health checks, Prometheus metrics and target status

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dpa_lib::{
    cycle::{CycleScheduler, TargetRegistry},
    health::{ComponentStatus, HealthRegistry},
    observability::ControllerMetrics,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: ControllerMetrics,
    pub targets: Arc<TargetRegistry>,
    /// Needed to remove targets; read-only without it
    pub scheduler: Option<Arc<CycleScheduler>>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: ControllerMetrics,
        targets: Arc<TargetRegistry>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            targets,
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<CycleScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}

/// 200 while healthy or degraded, 503 once a component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics.set_targets_monitored(state.targets.len() as i64);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn list_targets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.targets.summaries())
}

async fn get_target(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = format!("{}/{}", namespace, name);
    match state.targets.summary(&key) {
        Some(summary) => (StatusCode::OK, Json(json!(summary))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("target {} not found", key) })),
        ),
    }
}

async fn delete_target(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let key = format!("{}/{}", namespace, name);
    let Some(scheduler) = &state.scheduler else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "target removal is not available" })),
        );
    };

    if scheduler.remove_target(&key) {
        state.metrics.set_targets_monitored(state.targets.len() as i64);
        (StatusCode::OK, Json(json!({ "removed": key })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("target {} not found", key) })),
        )
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/targets", get(list_targets))
        .route(
            "/api/v1/targets/:namespace/:name",
            get(get_target).delete(delete_target),
        )
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
