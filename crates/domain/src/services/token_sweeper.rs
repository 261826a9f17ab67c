//! Periodic purge of dead download tokens.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{bounded, DEFAULT_STORE_TIMEOUT};
use crate::errors::ReportError;
use crate::stores::{JobStore, TokenStore};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: u64,
    pub orphaned: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.expired + self.orphaned
    }
}

/// Deletes expired tokens and tokens whose report no longer exists.
///
/// Only rows that are already dead are touched, so a sweep can run
/// alongside issuance and redemption.
pub struct ExpirySweeper {
    tokens: Arc<dyn TokenStore>,
    jobs: Arc<dyn JobStore>,
    store_timeout: Duration,
}

impl ExpirySweeper {
    pub fn new(tokens: Arc<dyn TokenStore>, jobs: Arc<dyn JobStore>) -> Self {
        Self {
            tokens,
            jobs,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub async fn sweep(&self) -> Result<SweepReport, ReportError> {
        let expired = bounded(
            self.store_timeout,
            "delete_expired_tokens",
            self.tokens.delete_expired(Utc::now()),
        )
        .await?;

        let orphaned = match bounded(
            self.store_timeout,
            "delete_orphaned_tokens",
            self.tokens.delete_orphaned(),
        )
        .await?
        {
            Some(orphaned) => orphaned,
            None => self.delete_orphans_by_lookup().await?,
        };

        let report = SweepReport { expired, orphaned };
        if report.total() > 0 {
            tracing::info!(
                expired = report.expired,
                orphaned = report.orphaned,
                "Download token sweep removed tokens"
            );
        } else {
            tracing::debug!("Download token sweep found nothing to remove");
        }
        Ok(report)
    }

    /// Per-report fallback for stores that cannot delete orphans themselves.
    async fn delete_orphans_by_lookup(&self) -> Result<u64, ReportError> {
        let mut orphaned = 0;
        let report_ids = bounded(self.store_timeout, "token_report_ids", self.tokens.report_ids())
            .await?;
        for report_id in report_ids {
            let exists = bounded(self.store_timeout, "find_job", self.jobs.find(report_id))
                .await?
                .is_some();
            if !exists {
                orphaned += bounded(
                    self.store_timeout,
                    "delete_tokens_for_report",
                    self.tokens.delete_by_report_id(report_id),
                )
                .await?;
            }
        }
        Ok(orphaned)
    }
}
