//! Report job domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Default number of jobs returned by list endpoints.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Upper bound for list endpoints.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Largest serialized parameter blob accepted at submission.
pub const MAX_REPORT_PARAMS_BYTES: usize = 64 * 1024;

/// Persisted status code that does not map to any [`ReportStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid report status code: {0}")]
pub struct InvalidStatusCode(pub i16);

/// Lifecycle state of a report job.
///
/// Persisted as a small integer; see [`ReportStatus::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    /// Persisted ordinal for this status.
    pub const fn code(self) -> i16 {
        match self {
            ReportStatus::Queued => 0,
            ReportStatus::Processing => 1,
            ReportStatus::Completed => 2,
            ReportStatus::Failed => 3,
        }
    }

    /// COMPLETED and FAILED admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    /// Source states from which a job may move into `self`.
    ///
    /// QUEUED is only ever produced by creation, so it has no sources.
    pub fn allowed_sources(self) -> &'static [ReportStatus] {
        match self {
            ReportStatus::Queued => &[],
            ReportStatus::Processing => &[ReportStatus::Queued],
            ReportStatus::Completed => &[ReportStatus::Processing],
            ReportStatus::Failed => &[ReportStatus::Queued, ReportStatus::Processing],
        }
    }

    /// Whether `from -> to` is a legal transition.
    pub fn can_transition(from: ReportStatus, to: ReportStatus) -> bool {
        to.allowed_sources().contains(&from)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Queued => "QUEUED",
            ReportStatus::Processing => "PROCESSING",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
        }
    }
}

impl TryFrom<i16> for ReportStatus {
    type Error = InvalidStatusCode;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ReportStatus::Queued),
            1 => Ok(ReportStatus::Processing),
            2 => Ok(ReportStatus::Completed),
            3 => Ok(ReportStatus::Failed),
            other => Err(InvalidStatusCode(other)),
        }
    }
}

impl From<ReportStatus> for i16 {
    fn from(status: ReportStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "QUEUED" => Ok(ReportStatus::Queued),
            "PROCESSING" => Ok(ReportStatus::Processing),
            "COMPLETED" => Ok(ReportStatus::Completed),
            "FAILED" => Ok(ReportStatus::Failed),
            _ => Err(format!("Unknown report status: {}", s)),
        }
    }
}

/// Kind of report a job produces. Interpreted by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    UserActivity,
    ActivityByUser,
    DummyTest,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [
        ReportType::UserActivity,
        ReportType::ActivityByUser,
        ReportType::DummyTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::UserActivity => "USER_ACTIVITY",
            ReportType::ActivityByUser => "ACTIVITY_BY_USER",
            ReportType::DummyTest => "DUMMY_TEST",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "USER_ACTIVITY" => Ok(ReportType::UserActivity),
            "ACTIVITY_BY_USER" => Ok(ReportType::ActivityByUser),
            "DUMMY_TEST" => Ok(ReportType::DummyTest),
            _ => Err(s.to_string()),
        }
    }
}

/// One report generation request and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    pub report_id: Uuid,
    pub user_id: i64,
    pub district_id: i64,
    pub report_type: ReportType,
    pub report_params: serde_json::Value,
    pub status: ReportStatus,
    pub requested_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ReportJob {
    /// Builds a freshly queued job stamped with `now`.
    pub fn queued(
        user_id: i64,
        district_id: i64,
        report_type: ReportType,
        report_params: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            user_id,
            district_id,
            report_type,
            report_params,
            status: ReportStatus::Queued,
            requested_date: now,
            created_at: now,
            updated_at: now,
            result_location: None,
            failure_reason: None,
        }
    }
}

/// Request body for submitting a report.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 64, message = "reportType is required"))]
    pub report_type: String,
    #[serde(default)]
    #[validate(custom(function = "validate_report_params"))]
    pub report_params: serde_json::Value,
}

/// Parameters must be a JSON object (or absent) of bounded size.
pub fn validate_report_params(params: &serde_json::Value) -> Result<(), ValidationError> {
    match params {
        serde_json::Value::Null | serde_json::Value::Object(_) => {}
        _ => {
            let mut err = ValidationError::new("report_params_shape");
            err.message = Some("reportParams must be a JSON object".into());
            return Err(err);
        }
    }

    if params.to_string().len() > MAX_REPORT_PARAMS_BYTES {
        let mut err = ValidationError::new("report_params_size");
        err.message = Some("reportParams is too large".into());
        return Err(err);
    }

    Ok(())
}

/// Query for listing the caller's reports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListReportsQuery {
    pub limit: Option<i64>,
}

/// Query for listing a district's reports by status.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDistrictReportsQuery {
    pub status: String,
    pub limit: Option<i64>,
}

/// Response wrapper for report lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsResponse {
    pub data: Vec<ReportJob>,
    pub count: usize,
}

impl From<Vec<ReportJob>> for ListReportsResponse {
    fn from(data: Vec<ReportJob>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

/// Lifecycle event delivered by a report worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLifecycleEvent {
    pub status: ReportStatus,
    #[serde(default, alias = "result_location")]
    pub result_location: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Acknowledgement returned to workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEventAck {
    pub report_id: Uuid,
    pub status: ReportStatus,
    /// False when the event was a duplicate delivery of an applied state.
    pub applied: bool,
}
