//! In-memory store implementations.
//!
//! Used by unit and HTTP tests and for running the service without a
//! database. Each mutation happens under a single write guard, which gives
//! the same compare-on-write semantics as the SQL implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobStore, StatusTransition, StoreError, ThresholdConfigStore, TokenStore};
use crate::models::{DownloadToken, ReportJob, ReportStatus, ReportType, ThresholdConfig};

/// In-memory [`JobStore`].
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, ReportJob>>,
    latency: Option<Duration>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation, for exercising store timeouts.
    #[cfg(test)]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            jobs: RwLock::default(),
            latency: Some(latency),
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn newest_first(jobs: &mut [ReportJob]) {
    jobs.sort_by(|a, b| {
        b.requested_date
            .cmp(&a.requested_date)
            .then_with(|| b.report_id.cmp(&a.report_id))
    });
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: ReportJob) -> Result<ReportJob, StoreError> {
        self.simulate_latency().await;
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.report_id) {
            return Err(StoreError::Duplicate(job.report_id.to_string()));
        }
        jobs.insert(job.report_id, job.clone());
        Ok(job)
    }

    async fn find(&self, report_id: Uuid) -> Result<Option<ReportJob>, StoreError> {
        self.simulate_latency().await;
        Ok(self.jobs.read().await.get(&report_id).cloned())
    }

    async fn transition(
        &self,
        transition: StatusTransition,
    ) -> Result<Option<ReportJob>, StoreError> {
        self.simulate_latency().await;
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&transition.report_id) else {
            return Ok(None);
        };
        if !transition.from.contains(&job.status) {
            return Ok(None);
        }

        job.status = transition.to;
        if let Some(location) = transition.result_location {
            job.result_location = Some(location);
        }
        if let Some(reason) = transition.failure_reason {
            job.failure_reason = Some(reason);
        }
        job.updated_at = job.updated_at.max(transition.at);
        Ok(Some(job.clone()))
    }

    async fn list_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<ReportJob>, StoreError> {
        self.simulate_latency().await;
        let mut jobs: Vec<ReportJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut jobs);
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn list_for_district(
        &self,
        district_id: i64,
        status: ReportStatus,
        limit: i64,
    ) -> Result<Vec<ReportJob>, StoreError> {
        self.simulate_latency().await;
        let mut jobs: Vec<ReportJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|j| j.district_id == district_id && j.status == status)
            .cloned()
            .collect();
        newest_first(&mut jobs);
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn delete(&self, report_id: Uuid) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        Ok(self.jobs.write().await.remove(&report_id).is_some())
    }
}

/// In-memory [`TokenStore`].
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<String, DownloadToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: DownloadToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token) {
            return Err(StoreError::Duplicate("download token".to_string()));
        }
        tokens.insert(token.token.clone(), token);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<DownloadToken>, StoreError> {
        Ok(self.tokens.read().await.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.tokens.write().await.remove(token).is_some())
    }

    async fn delete_by_report_id(&self, report_id: Uuid) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.report_id != report_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }

    async fn report_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let ids: BTreeSet<Uuid> = self
            .tokens
            .read()
            .await
            .values()
            .map(|t| t.report_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}

/// In-memory [`ThresholdConfigStore`].
#[derive(Debug, Default)]
pub struct InMemoryThresholdConfigStore {
    configs: RwLock<HashMap<ReportType, ThresholdConfig>>,
}

impl InMemoryThresholdConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThresholdConfigStore for InMemoryThresholdConfigStore {
    async fn get(&self, report_type: ReportType) -> Result<Option<ThresholdConfig>, StoreError> {
        Ok(self.configs.read().await.get(&report_type).cloned())
    }

    async fn list(&self) -> Result<Vec<ThresholdConfig>, StoreError> {
        let mut configs: Vec<ThresholdConfig> =
            self.configs.read().await.values().cloned().collect();
        configs.sort_by_key(|c| c.report_type.as_str());
        Ok(configs)
    }

    async fn upsert(&self, config: ThresholdConfig) -> Result<ThresholdConfig, StoreError> {
        self.configs
            .write()
            .await
            .insert(config.report_type, config.clone());
        Ok(config)
    }
}
