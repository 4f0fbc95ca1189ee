// Per-client rate limiting, applied to the scan routes. Keyed by caller
// address and path; limiter errors fail open so a broken counter backend
// never takes the API down with it.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app::AppState;
use crate::utils::service_error::ServiceError;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.enable_rate_limiting {
        return next.run(request).await;
    }

    let key = format!("{}:{}", client_address(&request), request.uri().path());
    match state.rate_limiter.check(&key).await {
        Ok(result) if !result.allowed => ServiceError::RateLimited {
            retry_after: result.retry_after.unwrap_or(60),
        }
        .into_response(),
        Ok(_) => next.run(request).await,
        Err(e) => {
            warn!("Rate limit check failed: {e}");
            next.run(request).await
        },
    }
}

/// Proxy-forwarded address when present, socket address otherwise.
fn client_address(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
