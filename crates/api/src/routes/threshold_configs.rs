//! Per-report-type threshold configuration.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use domain::models::{ReportType, ThresholdConfig, UpsertThresholdConfigRequest};
use domain::services::bounded;
use domain::ReportError;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthenticatedPrincipal;

#[derive(Debug, Serialize)]
pub struct ListThresholdConfigsResponse {
    pub data: Vec<ThresholdConfig>,
}

fn parse_report_type(raw: &str) -> Result<ReportType, ApiError> {
    raw.parse()
        .map_err(|t| ReportError::UnsupportedReportType(t).into())
}

/// GET /api/v1/threshold-configs
pub async fn list_threshold_configs(
    State(state): State<AppState>,
    _principal: AuthenticatedPrincipal,
) -> Result<Json<ListThresholdConfigsResponse>, ApiError> {
    let data = bounded(
        state.store_timeout(),
        "list_threshold_configs",
        state.thresholds.list(),
    )
    .await?;
    Ok(Json(ListThresholdConfigsResponse { data }))
}

/// GET /api/v1/threshold-configs/:report_type
pub async fn get_threshold_config(
    State(state): State<AppState>,
    _principal: AuthenticatedPrincipal,
    Path(report_type): Path<String>,
) -> Result<Json<ThresholdConfig>, ApiError> {
    let report_type = parse_report_type(&report_type)?;
    bounded(
        state.store_timeout(),
        "get_threshold_config",
        state.thresholds.get(report_type),
    )
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("No threshold config for {}", report_type)))
}

/// Create or replace a threshold config.
///
/// PUT /api/v1/admin/threshold-configs/:report_type
///
/// ADMIN only.
pub async fn upsert_threshold_config(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(report_type): Path<String>,
    Json(request): Json<UpsertThresholdConfigRequest>,
) -> Result<Json<ThresholdConfig>, ApiError> {
    if !principal.is_admin() {
        return Err(ApiError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }
    request.validate()?;
    let report_type = parse_report_type(&report_type)?;

    let config = bounded(
        state.store_timeout(),
        "upsert_threshold_config",
        state.thresholds.upsert(request.into_config(report_type, Utc::now())),
    )
    .await?;

    info!(
        report_type = %report_type,
        max_rows = config.max_rows,
        user_id = principal.user_id,
        "Threshold config updated"
    );
    Ok(Json(config))
}
