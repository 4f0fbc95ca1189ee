// Scan API endpoints: quick scan, deep AI analysis, community reporting.
// Handlers validate and delegate; all the logic lives in the services.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;
use validator::Validate;

use crate::{
    app::AppState,
    models::report::{ReportRecord, ReportRequest, ReportResponse, ScanRequest, ScanResponse},
    models::scan::AnalysisResult,
    utils::{service_error::ServiceError, url_normalizer::normalize},
};

/// Fast community/heuristic verdict, no provider fan-out.
/// POST /api/v1/scan
pub async fn quick_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ServiceError> {
    request.validate()?;
    let normalized = normalize(&request.url)?;

    let outcome = state.quick_scan.scan(&request.url, &normalized).await?;
    Ok(Json(ScanResponse {
        url: request.url,
        normalized_url: normalized.to_string(),
        verdict: outcome.verdict,
        reasons: outcome.reasons,
        report_count: outcome.report_count,
    }))
}

/// Full multi-provider analysis with AI narrative; served from the result
/// cache when a fresh entry exists.
/// POST /api/v1/scan/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<AnalysisResult>, ServiceError> {
    request.validate()?;
    let result = state.scan_service.analyze(&request.url).await?;
    Ok(Json(result))
}

/// Record a community report against a URL.
/// POST /api/v1/scan/report
pub async fn report_url(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;
    let normalized = normalize(&request.url)?;

    let report_count = state
        .reports
        .add(&normalized, ReportRecord::new(request.reason))
        .await?;
    info!("community report recorded for {normalized} (total {report_count})");

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            success: true,
            normalized_url: normalized.to_string(),
            report_count,
        }),
    ))
}
