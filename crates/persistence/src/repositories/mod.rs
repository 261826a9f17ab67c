//! Repository implementations for database operations.
//!
//! Each repository implements the matching store trait from the domain
//! crate so services never see `sqlx` types.

pub mod download_token;
pub mod notification_outbox;
pub mod report_job;
pub mod threshold_config;

pub use download_token::DownloadTokenRepository;
pub use notification_outbox::NotificationOutboxRepository;
pub use report_job::ReportJobRepository;
pub use threshold_config::ThresholdConfigRepository;

use domain::stores::StoreError;

/// PostgreSQL unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Classify a sqlx error for the domain layer.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(db.message().to_string())
        }
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)) => StoreError::Corruption(e.to_string()),
        other => {
            tracing::error!(error = %other, "Database operation failed");
            StoreError::Unavailable(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_missing_column_is_corruption() {
        assert!(matches!(
            store_error(sqlx::Error::ColumnNotFound("status".into())),
            StoreError::Corruption(_)
        ));
    }
}
