// Application state and router assembly.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    app_config::AppConfig,
    db::RedisPool,
    handlers,
    middleware::rate_limit_middleware,
    services::{QuickScanService, RateLimiter, ReportStore, ScanService},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub scan_service: Arc<ScanService>,
    pub quick_scan: Arc<QuickScanService>,
    pub reports: Arc<dyn ReportStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub redis_pool: Option<RedisPool>,
}

/// Build the API router. Scan routes sit behind the rate limiter; health
/// does not.
pub fn router(state: AppState) -> Router {
    let scan_routes = Router::new()
        .route("/scan", post(handlers::scan::quick_scan))
        .route("/scan/analyze", post(handlers::scan::analyze))
        .route("/scan/report", post(handlers::scan::report_url))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/api/v1/health", get(handlers::health::health_check))
        .nest("/api/v1", scan_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
