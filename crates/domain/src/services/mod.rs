//! Domain services for report jobs and download tokens.
//!
//! Services contain business logic that operates on domain models and the
//! store traits; they never touch a concrete database.

pub mod access_guard;
pub mod download_tokens;
pub mod notification;
pub mod report_lifecycle;
pub mod token_sweeper;

use std::future::Future;
use std::time::Duration;

use crate::errors::ReportError;
use crate::stores::StoreError;

pub use access_guard::AccessGuard;
pub use download_tokens::TokenIssuer;
pub use notification::{NotificationResult, RecordingNotifier, ReportNotification, ReportNotifier};
pub use report_lifecycle::{ReportLifecycleManager, TransitionOutcome};
pub use token_sweeper::{ExpirySweeper, SweepReport};

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store call under a deadline, mapping expiry to `StoreTimeout`.
pub async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, ReportError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(ReportError::from),
        Err(_) => {
            tracing::warn!(
                operation = operation,
                timeout_ms = limit.as_millis() as u64,
                "Store operation timed out"
            );
            Err(ReportError::StoreTimeout {
                operation,
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let ok: Result<u8, ReportError> =
            bounded(Duration::from_secs(1), "noop", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u8, ReportError> = bounded(Duration::from_secs(1), "noop", async {
            Err(StoreError::Corruption("bad row".into()))
        })
        .await;
        assert!(matches!(err, Err(ReportError::Corruption(_))));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, StoreError>(())
        };
        let result = bounded(Duration::from_millis(10), "slow_op", slow).await;
        match result {
            Err(ReportError::StoreTimeout {
                operation,
                timeout_ms,
            }) => {
                assert_eq!(operation, "slow_op");
                assert_eq!(timeout_ms, 10);
            }
            other => panic!("expected StoreTimeout, got {:?}", other),
        }
    }
}
