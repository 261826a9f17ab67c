//! Report job entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{ReportJob, ReportStatus, ReportType};
use domain::stores::StoreError;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the report_jobs table.
#[derive(Debug, Clone, FromRow)]
pub struct ReportJobEntity {
    pub report_id: Uuid,
    pub user_id: i64,
    pub district_id: i64,
    pub report_type: String,
    pub report_params: JsonValue,
    pub status: i16,
    pub requested_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub result_location: Option<String>,
    pub failure_reason: Option<String>,
}

/// Unknown status codes and report types are corruption, never coerced.
impl TryFrom<ReportJobEntity> for ReportJob {
    type Error = StoreError;

    fn try_from(entity: ReportJobEntity) -> Result<Self, Self::Error> {
        let status = ReportStatus::try_from(entity.status).map_err(|e| {
            StoreError::Corruption(format!("report {}: {}", entity.report_id, e))
        })?;
        let report_type: ReportType = entity.report_type.parse().map_err(|raw| {
            StoreError::Corruption(format!(
                "report {}: unknown report type '{}'",
                entity.report_id, raw
            ))
        })?;

        Ok(Self {
            report_id: entity.report_id,
            user_id: entity.user_id,
            district_id: entity.district_id,
            report_type,
            report_params: entity.report_params,
            status,
            requested_date: entity.requested_date,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            result_location: entity.result_location,
            failure_reason: entity.failure_reason,
        })
    }
}
