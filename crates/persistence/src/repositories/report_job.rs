//! Report job repository for database operations.

use async_trait::async_trait;
use domain::models::{ReportJob, ReportStatus};
use domain::stores::{JobStore, StatusTransition, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use super::store_error;
use crate::entities::ReportJobEntity;
use crate::metrics::QueryTimer;

/// Repository for report job database operations.
#[derive(Clone)]
pub struct ReportJobRepository {
    pool: PgPool,
}

impl ReportJobRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_jobs(entities: Vec<ReportJobEntity>) -> Result<Vec<ReportJob>, StoreError> {
    entities.into_iter().map(ReportJob::try_from).collect()
}

#[async_trait]
impl JobStore for ReportJobRepository {
    async fn insert(&self, job: ReportJob) -> Result<ReportJob, StoreError> {
        let timer = QueryTimer::new("insert_report_job");
        let result = sqlx::query_as::<_, ReportJobEntity>(
            r#"
            INSERT INTO report_jobs (report_id, user_id, district_id, report_type, report_params,
                                     status, requested_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING report_id, user_id, district_id, report_type, report_params, status,
                      requested_date, created_at, updated_at, result_location, failure_reason
            "#,
        )
        .bind(job.report_id)
        .bind(job.user_id)
        .bind(job.district_id)
        .bind(job.report_type.as_str())
        .bind(&job.report_params)
        .bind(job.status.code())
        .bind(job.requested_date)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map_err(store_error)?.try_into()
    }

    async fn find(&self, report_id: Uuid) -> Result<Option<ReportJob>, StoreError> {
        let timer = QueryTimer::new("find_report_job");
        let result = sqlx::query_as::<_, ReportJobEntity>(
            r#"
            SELECT report_id, user_id, district_id, report_type, report_params, status,
                   requested_date, created_at, updated_at, result_location, failure_reason
            FROM report_jobs
            WHERE report_id = $1
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(ReportJob::try_from)
            .transpose()
    }

    async fn transition(
        &self,
        transition: StatusTransition,
    ) -> Result<Option<ReportJob>, StoreError> {
        let expected: Vec<i16> = transition.from.iter().map(|s| s.code()).collect();

        let timer = QueryTimer::new("transition_report_job");
        let result = sqlx::query_as::<_, ReportJobEntity>(
            r#"
            UPDATE report_jobs
            SET status = $2,
                result_location = COALESCE($3, result_location),
                failure_reason = COALESCE($4, failure_reason),
                updated_at = GREATEST(updated_at, $5)
            WHERE report_id = $1 AND status = ANY($6)
            RETURNING report_id, user_id, district_id, report_type, report_params, status,
                      requested_date, created_at, updated_at, result_location, failure_reason
            "#,
        )
        .bind(transition.report_id)
        .bind(transition.to.code())
        .bind(transition.result_location)
        .bind(transition.failure_reason)
        .bind(transition.at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result
            .map_err(store_error)?
            .map(ReportJob::try_from)
            .transpose()
    }

    async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<ReportJob>, StoreError> {
        let timer = QueryTimer::new("list_report_jobs_for_user");
        let result = sqlx::query_as::<_, ReportJobEntity>(
            r#"
            SELECT report_id, user_id, district_id, report_type, report_params, status,
                   requested_date, created_at, updated_at, result_location, failure_reason
            FROM report_jobs
            WHERE user_id = $1
            ORDER BY requested_date DESC, report_id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        into_jobs(result.map_err(store_error)?)
    }

    async fn list_for_district(
        &self,
        district_id: i64,
        status: ReportStatus,
        limit: i64,
    ) -> Result<Vec<ReportJob>, StoreError> {
        let timer = QueryTimer::new("list_report_jobs_for_district");
        let result = sqlx::query_as::<_, ReportJobEntity>(
            r#"
            SELECT report_id, user_id, district_id, report_type, report_params, status,
                   requested_date, created_at, updated_at, result_location, failure_reason
            FROM report_jobs
            WHERE district_id = $1 AND status = $2
            ORDER BY requested_date DESC, report_id DESC
            LIMIT $3
            "#,
        )
        .bind(district_id)
        .bind(status.code())
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        into_jobs(result.map_err(store_error)?)
    }

    async fn delete(&self, report_id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_report_job");
        let result = sqlx::query("DELETE FROM report_jobs WHERE report_id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected() > 0)
    }
}
