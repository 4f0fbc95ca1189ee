// Health check endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;

/// GET /api/v1/health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let cache_health = match &state.redis_pool {
        Some(pool) => {
            let health = pool.health_check().await;
            if !health.is_healthy {
                overall_healthy = false;
            }
            json!({
                "status": if health.is_healthy { "healthy" } else { "unhealthy" },
                "backend": "redis",
                "latency_ms": health.latency_ms,
                "error": health.error
            })
        }
        None => json!({
            "status": "healthy",
            "backend": "memory",
            "error": null
        }),
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "zerobait-backend",
        "timestamp": timestamp,
        "components": {
            "cache": cache_health
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
