//! Download token repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::DownloadToken;
use domain::stores::{StoreError, TokenStore};
use sqlx::PgPool;
use uuid::Uuid;

use super::store_error;
use crate::entities::DownloadTokenEntity;
use crate::metrics::QueryTimer;

/// Repository for download token database operations.
#[derive(Clone)]
pub struct DownloadTokenRepository {
    pool: PgPool,
}

impl DownloadTokenRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for DownloadTokenRepository {
    async fn insert(&self, token: DownloadToken) -> Result<(), StoreError> {
        let timer = QueryTimer::new("insert_download_token");
        let result = sqlx::query(
            r#"
            INSERT INTO download_tokens (token, report_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(token.report_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map_err(store_error)?;
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<DownloadToken>, StoreError> {
        let timer = QueryTimer::new("find_download_token");
        let result = sqlx::query_as::<_, DownloadTokenEntity>(
            r#"
            SELECT token, report_id, expires_at, created_at
            FROM download_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.map(Into::into))
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_download_token");
        let result = sqlx::query("DELETE FROM download_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected() > 0)
    }

    async fn delete_by_report_id(&self, report_id: Uuid) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_download_tokens_for_report");
        let result = sqlx::query("DELETE FROM download_tokens WHERE report_id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_expired_download_tokens");
        let result = sqlx::query("DELETE FROM download_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected())
    }

    async fn report_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let timer = QueryTimer::new("download_token_report_ids");
        let result = sqlx::query_scalar::<_, Uuid>("SELECT DISTINCT report_id FROM download_tokens")
            .fetch_all(&self.pool)
            .await;
        timer.record();

        result.map_err(store_error)
    }
    async fn delete_orphaned(&self) -> Result<Option<u64>, StoreError> {
        let timer = QueryTimer::new("delete_orphaned_download_tokens");
        let result = sqlx::query(
            r#"
            DELETE FROM download_tokens t
            WHERE NOT EXISTS (
                SELECT 1 FROM report_jobs j WHERE j.report_id = t.report_id
            )
            "#,
        )
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(Some(result.map_err(store_error)?.rows_affected()))
    }
}
