//! Threshold config repository for database operations.

use async_trait::async_trait;
use domain::models::{ReportType, ThresholdConfig};
use domain::stores::{StoreError, ThresholdConfigStore};
use sqlx::PgPool;

use super::store_error;
use crate::entities::ThresholdConfigEntity;
use crate::metrics::QueryTimer;

/// Repository for per-report-type threshold configs.
#[derive(Clone)]
pub struct ThresholdConfigRepository {
    pool: PgPool,
}

impl ThresholdConfigRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThresholdConfigStore for ThresholdConfigRepository {
    async fn get(&self, report_type: ReportType) -> Result<Option<ThresholdConfig>, StoreError> {
        let timer = QueryTimer::new("find_threshold_config");
        let result = sqlx::query_as::<_, ThresholdConfigEntity>(
            r#"
            SELECT report_type, max_rows, max_file_size_bytes, updated_at
            FROM threshold_configs
            WHERE report_type = $1
            "#,
        )
        .bind(report_type.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(ThresholdConfig::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<ThresholdConfig>, StoreError> {
        let timer = QueryTimer::new("list_threshold_configs");
        let result = sqlx::query_as::<_, ThresholdConfigEntity>(
            r#"
            SELECT report_type, max_rows, max_file_size_bytes, updated_at
            FROM threshold_configs
            ORDER BY report_type
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .into_iter()
            .map(ThresholdConfig::try_from)
            .collect()
    }

    async fn upsert(&self, config: ThresholdConfig) -> Result<ThresholdConfig, StoreError> {
        let timer = QueryTimer::new("upsert_threshold_config");
        let result = sqlx::query_as::<_, ThresholdConfigEntity>(
            r#"
            INSERT INTO threshold_configs (report_type, max_rows, max_file_size_bytes, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (report_type) DO UPDATE
            SET max_rows = EXCLUDED.max_rows,
                max_file_size_bytes = EXCLUDED.max_file_size_bytes,
                updated_at = EXCLUDED.updated_at
            RETURNING report_type, max_rows, max_file_size_bytes, updated_at
            "#,
        )
        .bind(config.report_type.as_str())
        .bind(config.max_rows)
        .bind(config.max_file_size_bytes)
        .bind(config.updated_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map_err(store_error)?.try_into()
    }
}
