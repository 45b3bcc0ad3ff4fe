/// Health check and metrics endpoints
///
/// Supports two types of probes:
/// - Liveness: Is the process alive? (restart if not)
/// - Readiness: Can the admin store serve requests? (remove from load balancer if not)

use crate::{context::AdminContext, metrics, store::ADMIN_AUDIT_LOG};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    /// Store round-trip in milliseconds
    pub store_response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AdminContext> {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness_probe))
        .route("/metrics", get(render_metrics))
}

/// Liveness probe
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check: the document store must answer a point lookup
pub async fn health(State(ctx): State<AdminContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let result = ctx.store.get(ADMIN_AUDIT_LOG, "health-probe").await;
    let elapsed = start.elapsed().as_millis() as u64;

    let (code, status, error) = match result {
        Ok(_) => (StatusCode::OK, "healthy", None),
        Err(e) => {
            tracing::warn!(error = %e, "health_check_failed: store lookup failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.to_string()))
        }
    };

    (
        code,
        Json(HealthStatus {
            status: status.to_string(),
            version: ctx.config.service.version.clone(),
            store_response_time_ms: elapsed,
            error,
        }),
    )
}

/// Prometheus text exposition
pub async fn render_metrics() -> Response {
    match metrics::render_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
