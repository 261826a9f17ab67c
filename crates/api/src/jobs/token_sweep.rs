//! Background job that purges dead download tokens.

use domain::services::ExpirySweeper;
use std::sync::Arc;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_token_sweep;

/// Runs the [`ExpirySweeper`] on a fixed period, starting at boot so tokens
/// that expired while the service was down are removed promptly.
pub struct TokenSweepJob {
    sweeper: Arc<ExpirySweeper>,
    frequency: JobFrequency,
}

impl TokenSweepJob {
    pub fn new(sweeper: Arc<ExpirySweeper>, interval_secs: u64) -> Self {
        Self {
            sweeper,
            frequency: JobFrequency::Seconds(interval_secs),
        }
    }
}

#[async_trait::async_trait]
impl Job for TokenSweepJob {
    fn name(&self) -> &'static str {
        "download_token_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        self.frequency
    }

    fn run_at_startup(&self) -> bool {
        true
    }

    async fn execute(&self) -> anyhow::Result<()> {
        let report = self.sweeper.sweep().await?;
        record_token_sweep(&report);
        Ok(())
    }
}
