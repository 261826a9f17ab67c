//! Report job routes: submission, listing, viewing, deletion, regeneration
//! and download token issuance.
//!
//! Every route that names a report loads it first and checks it with the
//! [`AccessGuard`] before doing anything else.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Duration;
use domain::models::{
    CreateReportRequest, DownloadTokenResponse, IssueDownloadTokenRequest,
    ListDistrictReportsQuery, ListReportsQuery, ListReportsResponse, Principal, ReportJob,
    ReportStatus,
};
use domain::services::AccessGuard;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedPrincipal;
use crate::middleware::metrics::{record_download_token_issued, record_report_created};

/// An empty body means defaults; anything else must parse.
fn parse_issue_request(body: &[u8]) -> Result<IssueDownloadTokenRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IssueDownloadTokenRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

/// Load a report and check the caller may see it.
async fn load_visible(
    state: &AppState,
    principal: &Principal,
    report_id: Uuid,
) -> Result<ReportJob, ApiError> {
    let job = state.reports.get(report_id).await?;
    AccessGuard::ensure_can_view(Some(principal), &job)?;
    Ok(job)
}

/// Submit a report for generation.
///
/// POST /api/v1/reports
///
/// The job is owned by the caller and belongs to the caller's district.
pub async fn create_report(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportJob>), ApiError> {
    request.validate()?;

    let job = state.reports.submit(&principal, request).await?;
    record_report_created(job.report_type);

    Ok((StatusCode::CREATED, Json(job)))
}

/// List the caller's own reports, newest first.
///
/// GET /api/v1/reports?limit=
pub async fn list_reports(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ListReportsResponse>, ApiError> {
    let jobs = state
        .reports
        .list_for_user(principal.user_id, query.limit)
        .await?;
    Ok(Json(jobs.into()))
}

/// GET /api/v1/reports/:report_id
pub async fn get_report(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportJob>, ApiError> {
    let job = load_visible(&state, &principal, report_id).await?;
    Ok(Json(job))
}

/// Delete a report and every download token issued for it.
///
/// DELETE /api/v1/reports/:report_id
pub async fn delete_report(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(report_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    load_visible(&state, &principal, report_id).await?;

    state.reports.delete(report_id).await?;
    // Tokens left behind by a failure here are unusable and get swept.
    let revoked = state.downloads.revoke_for_report(report_id).await?;

    info!(
        report_id = %report_id,
        user_id = principal.user_id,
        revoked_tokens = revoked,
        "Report deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Queue a fresh run of a finished report.
///
/// POST /api/v1/reports/:report_id/regenerate
///
/// Tokens for the previous run stop working immediately.
pub async fn regenerate_report(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(report_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ReportJob>), ApiError> {
    load_visible(&state, &principal, report_id).await?;

    let job = state.reports.regenerate(report_id).await?;
    state.downloads.revoke_for_report(report_id).await?;
    record_report_created(job.report_type);

    Ok((StatusCode::CREATED, Json(job)))
}

/// Mint a download token for a completed report.
///
/// POST /api/v1/reports/:report_id/download-token
///
/// The body is optional; `ttlSecs` defaults to the configured lifetime.
/// A body that is present but not a valid request is rejected.
pub async fn issue_download_token(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(report_id): Path<Uuid>,
    body: Bytes,
) -> Result<(StatusCode, Json<DownloadTokenResponse>), ApiError> {
    let request = parse_issue_request(&body)?;
    request.validate()?;

    load_visible(&state, &principal, report_id).await?;

    let token = state
        .downloads
        .issue(report_id, request.ttl_secs.map(Duration::seconds))
        .await?;
    record_download_token_issued();

    info!(
        report_id = %report_id,
        user_id = principal.user_id,
        expires_at = %token.expires_at,
        "Download token issued to user"
    );
    Ok((StatusCode::CREATED, Json(token.into())))
}

/// List a district's reports with a given status.
///
/// GET /api/v1/districts/:district_id/reports?status=&limit=
///
/// ADMIN, or DISTRICT_ADMIN of that district.
pub async fn list_district_reports(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(district_id): Path<i64>,
    Query(query): Query<ListDistrictReportsQuery>,
) -> Result<Json<ListReportsResponse>, ApiError> {
    if !AccessGuard::can_view_district(Some(&principal), district_id) {
        return Err(ApiError::Forbidden(
            "You do not have access to this district".to_string(),
        ));
    }

    let status: ReportStatus = query.status.parse().map_err(ApiError::Validation)?;
    let jobs = state
        .reports
        .list_for_district(district_id, status, query.limit)
        .await?;
    Ok(Json(jobs.into()))
}
