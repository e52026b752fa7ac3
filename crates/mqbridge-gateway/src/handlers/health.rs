//! Health and service-info endpoints
//!
//! GET /        - service name, version and route count
//! GET /health  - liveness probe with broker connection state
//!
//! Neither endpoint goes through the filter pipeline.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "MQTT-Webhook Bridge";

/// GET /health - liveness probe
///
/// Always 200 while the process is alive; `mqtt_connected` reports the
/// gateway's last known connection state.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "mqtt_connected": state.gateway.is_connected(),
        })),
    )
}

/// GET / - basic service information
pub async fn service_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": state.api_version,
        "health": "/health",
        "routes": state.table.len(),
    }))
}

/// Build the health router sub-tree
pub fn health_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::get;
    axum::Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
}
