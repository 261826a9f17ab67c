//! Domain error taxonomy for report jobs and download tokens.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ReportStatus;
use crate::stores::StoreError;

/// Errors raised by the report services.
///
/// Every variant carries enough context (report id, current status,
/// attempted action) for the caller to render a precise message.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported report type: {0}")]
    UnsupportedReportType(String),

    #[error("Access to report {report_id} denied")]
    Forbidden { report_id: Uuid },

    #[error("Report {report_id} not found")]
    NotFound { report_id: Uuid },

    #[error("Download token not found")]
    TokenNotFound,

    #[error("Download token expired at {expired_at}")]
    TokenExpired { expired_at: DateTime<Utc> },

    #[error("Report {report_id} is not ready for download (status: {status})")]
    NotReady {
        report_id: Uuid,
        status: ReportStatus,
    },

    #[error("Report {report_id} cannot move from {from} to {to}")]
    IllegalTransition {
        report_id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
    },

    #[error("Store operation '{operation}' timed out after {timeout_ms}ms")]
    StoreTimeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Corrupted record: {0}")]
    Corruption(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl ReportError {
    /// Transient failures the caller may retry with backoff.
    ///
    /// Illegal transitions and not-ready conditions are never retryable.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReportError::StoreTimeout { .. } | ReportError::Store(_))
    }
}

impl From<StoreError> for ReportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corruption(msg) => ReportError::Corruption(msg),
            StoreError::Unavailable(msg) => ReportError::Store(msg),
            StoreError::Duplicate(msg) => ReportError::Store(format!("duplicate key: {}", msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let id = Uuid::new_v4();
        let err = ReportError::IllegalTransition {
            report_id: id,
            from: ReportStatus::Completed,
            to: ReportStatus::Processing,
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("COMPLETED"));
        assert!(msg.contains("PROCESSING"));

        let err = ReportError::NotReady {
            report_id: id,
            status: ReportStatus::Queued,
        };
        assert!(err.to_string().contains("QUEUED"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ReportError::StoreTimeout {
            operation: "find_job",
            timeout_ms: 10
        }
        .is_transient());
        assert!(ReportError::Store("down".into()).is_transient());
        assert!(!ReportError::TokenNotFound.is_transient());
        assert!(!ReportError::Corruption("bad".into()).is_transient());
    }

    #[test]
    fn test_from_store_error() {
        assert!(matches!(
            ReportError::from(StoreError::Corruption("status 9".into())),
            ReportError::Corruption(_)
        ));
        assert!(matches!(
            ReportError::from(StoreError::Unavailable("conn refused".into())),
            ReportError::Store(_)
        ));
    }
}
