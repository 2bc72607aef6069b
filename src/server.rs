//! Status API server.
//!
//! Small read-only surface over the collector: liveness/readiness probes,
//! collection statistics, and the most recent device snapshot. Collection
//! itself is driven by the scheduler in the binary, never by a request.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::collector::DeviceCollector;
use crate::device::record::DeviceRecord;
use crate::energy::EnergyAccumulator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<DeviceCollector>,
    /// Latest successfully collected snapshot, for `/api/devices`.
    pub devices: Arc<RwLock<Vec<DeviceRecord>>>,
    /// Per-device watt-hour totals, for `/api/energy`.
    pub energy: Arc<EnergyAccumulator>,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    appliance: Option<&'static str>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/api/status", get(status_handler))
        .route("/api/devices", get(devices_handler))
        .route("/api/energy", get(energy_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness probe: the process is up.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        appliance: None,
    })
}

/// Readiness probe: 200 only while the appliance is reachable.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    if state.collector.is_connected() {
        Json(HealthResponse {
            status: "ok",
            appliance: Some("connected"),
        })
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                appliance: Some("disconnected"),
            }),
        )
            .into_response()
    }
}

/// Collection statistics snapshot.
async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.collector.statistics())
}

/// Most recent device snapshot.
async fn devices_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let devices = state.devices.read().await;
    Json(devices.clone())
}

/// Accumulated per-device energy totals.
async fn energy_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.energy.totals())
}
