//! Per-report-type generation limits.
//!
//! One row per [`ReportType`]; writes are upserts. The worker reads these to
//! bound report size, this service only stores and serves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::report_job::ReportType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub report_type: ReportType,
    pub max_rows: i64,
    pub max_file_size_bytes: i64,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing a threshold config.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertThresholdConfigRequest {
    #[validate(range(min = 1, message = "maxRows must be positive"))]
    pub max_rows: i64,
    #[validate(range(min = 1, message = "maxFileSizeBytes must be positive"))]
    pub max_file_size_bytes: i64,
}

impl UpsertThresholdConfigRequest {
    pub fn into_config(self, report_type: ReportType, now: DateTime<Utc>) -> ThresholdConfig {
        ThresholdConfig {
            report_type,
            max_rows: self.max_rows,
            max_file_size_bytes: self.max_file_size_bytes,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_request_validation() {
        let ok = UpsertThresholdConfigRequest {
            max_rows: 10_000,
            max_file_size_bytes: 5_000_000,
        };
        assert!(ok.validate().is_ok());

        let bad = UpsertThresholdConfigRequest {
            max_rows: 0,
            max_file_size_bytes: 5,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_into_config() {
        let now = Utc::now();
        let config = UpsertThresholdConfigRequest {
            max_rows: 10,
            max_file_size_bytes: 20,
        }
        .into_config(ReportType::UserActivity, now);
        assert_eq!(config.report_type, ReportType::UserActivity);
        assert_eq!(config.max_rows, 10);
        assert_eq!(config.updated_at, now);
    }
}
