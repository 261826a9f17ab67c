//! Download token redemption.
//!
//! The token itself is the capability, so this route takes no bearer JWT.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use domain::ReportError;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_download_redemption;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub report_id: Uuid,
    pub result_location: String,
    /// Signed, short-lived URL for fetching the artifact.
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

fn redemption_outcome(err: &ReportError) -> &'static str {
    match err {
        ReportError::TokenNotFound => "not_found",
        ReportError::TokenExpired { .. } => "expired",
        ReportError::NotFound { .. } | ReportError::NotReady { .. } => "report_unavailable",
        _ => "error",
    }
}

/// GET /api/v1/downloads/:token
pub async fn redeem_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let resolved = match state.downloads.resolve(&token).await {
        Ok(resolved) => resolved,
        Err(e) => {
            record_download_redemption(redemption_outcome(&e));
            return Err(e.into());
        }
    };

    let download_url = state
        .storage
        .retrieval_url(&resolved.result_location, resolved.expires_at)
        .map_err(|e| ApiError::Internal(format!("Failed to sign download URL: {}", e)))?;
    record_download_redemption("ok");

    Ok(Json(DownloadResponse {
        report_id: resolved.report_id,
        result_location: resolved.result_location,
        download_url,
        expires_at: resolved.expires_at,
    }))
}
