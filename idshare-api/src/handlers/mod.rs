//! HTTP handlers, one module per resource

pub mod auth;
pub mod disclosure;
pub mod profile;
pub mod received;
pub mod sent;

use crate::types::HealthResponse;
use axum::Json;

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
