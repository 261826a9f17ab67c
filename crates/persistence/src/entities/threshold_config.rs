//! Threshold config entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{ReportType, ThresholdConfig};
use domain::stores::StoreError;
use sqlx::FromRow;

/// Database row mapping for the threshold_configs table.
#[derive(Debug, Clone, FromRow)]
pub struct ThresholdConfigEntity {
    pub report_type: String,
    pub max_rows: i64,
    pub max_file_size_bytes: i64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ThresholdConfigEntity> for ThresholdConfig {
    type Error = StoreError;

    fn try_from(entity: ThresholdConfigEntity) -> Result<Self, Self::Error> {
        let report_type: ReportType = entity.report_type.parse().map_err(|raw| {
            StoreError::Corruption(format!("threshold config for unknown report type '{}'", raw))
        })?;
        Ok(Self {
            report_type,
            max_rows: entity.max_rows,
            max_file_size_bytes: entity.max_file_size_bytes,
            updated_at: entity.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_entity_to_domain() {
        let entity = ThresholdConfigEntity {
            report_type: "ACTIVITY_BY_USER".to_string(),
            max_rows: 50_000,
            max_file_size_bytes: 10_485_760,
            updated_at: Utc::now(),
        };
        let config = ThresholdConfig::try_from(entity).unwrap();
        assert_eq!(config.report_type, ReportType::ActivityByUser);
        assert_eq!(config.max_rows, 50_000);
    }

    #[test]
    fn test_threshold_entity_unknown_type() {
        let entity = ThresholdConfigEntity {
            report_type: "LEGACY".to_string(),
            max_rows: 1,
            max_file_size_bytes: 1,
            updated_at: Utc::now(),
        };
        assert!(matches!(
            ThresholdConfig::try_from(entity),
            Err(StoreError::Corruption(_))
        ));
    }
}
