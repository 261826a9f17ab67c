//! Storage abstractions for report jobs, download tokens and threshold
//! configs.
//!
//! The PostgreSQL implementations live in the persistence crate;
//! [`memory`] provides in-process implementations for tests and local
//! development. Implementations must make every mutation an atomic,
//! single-row (or single-statement) operation.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DownloadToken, ReportJob, ReportStatus, ReportType, ThresholdConfig};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupted record: {0}")]
    Corruption(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

/// A compare-on-write status change for one job.
///
/// Applied only if the stored status is one of `from`. `updated_at` becomes
/// `max(updated_at, at)` so it never moves backwards.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub report_id: Uuid,
    pub from: &'static [ReportStatus],
    pub to: ReportStatus,
    pub result_location: Option<String>,
    pub failure_reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Durable keyed storage for report jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job.
    async fn insert(&self, job: ReportJob) -> Result<ReportJob, StoreError>;

    /// Look up a job by id.
    async fn find(&self, report_id: Uuid) -> Result<Option<ReportJob>, StoreError>;

    /// Apply a guarded transition.
    ///
    /// Returns the updated job, or `None` when the job is absent or its
    /// status is not in `transition.from`. Nothing is written in that case.
    async fn transition(&self, transition: StatusTransition)
        -> Result<Option<ReportJob>, StoreError>;

    /// Jobs owned by a user, most recently requested first.
    async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<ReportJob>, StoreError>;

    /// Jobs in a district with exactly the given status, most recent first.
    async fn list_for_district(
        &self,
        district_id: i64,
        status: ReportStatus,
        limit: i64,
    ) -> Result<Vec<ReportJob>, StoreError>;

    /// Remove a job. Returns whether a row was deleted.
    async fn delete(&self, report_id: Uuid) -> Result<bool, StoreError>;
}

/// Durable keyed storage for download tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: DownloadToken) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<DownloadToken>, StoreError>;

    async fn delete(&self, token: &str) -> Result<bool, StoreError>;

    /// Cascade delete of every token bound to a report.
    async fn delete_by_report_id(&self, report_id: Uuid) -> Result<u64, StoreError>;

    /// Delete every token with `expires_at < now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Distinct report ids that currently have tokens.
    async fn report_ids(&self) -> Result<Vec<Uuid>, StoreError>;

    /// Delete tokens whose report no longer exists, in one operation.
    ///
    /// `None` means the store cannot see reports and the caller must find
    /// orphans itself through [`TokenStore::report_ids`].
    async fn delete_orphaned(&self) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }
}

/// Keyed storage for per-report-type thresholds.
#[async_trait]
pub trait ThresholdConfigStore: Send + Sync {
    async fn get(&self, report_type: ReportType) -> Result<Option<ThresholdConfig>, StoreError>;

    async fn list(&self) -> Result<Vec<ThresholdConfig>, StoreError>;

    /// Insert or replace the single row for `config.report_type`.
    async fn upsert(&self, config: ThresholdConfig) -> Result<ThresholdConfig, StoreError>;
}
