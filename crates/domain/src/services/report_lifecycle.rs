//! Report job lifecycle.
//!
//! QUEUED -> PROCESSING -> {COMPLETED, FAILED}; QUEUED -> FAILED is also
//! allowed. Terminal states admit nothing. Every transition is a single
//! guarded write against the [`JobStore`], so concurrent callers racing on
//! the same job cannot both win.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use super::notification::{NotificationResult, ReportNotification, ReportNotifier};
use super::{bounded, DEFAULT_STORE_TIMEOUT};
use crate::errors::ReportError;
use crate::models::{
    CreateReportRequest, Principal, ReportJob, ReportLifecycleEvent, ReportStatus, ReportType,
    DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use crate::stores::{JobStore, StatusTransition};

/// Result of applying a worker event.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub job: ReportJob,
    /// False when the job was already in the requested state.
    pub applied: bool,
}

/// Orchestrates report job state changes.
pub struct ReportLifecycleManager {
    jobs: Arc<dyn JobStore>,
    notifier: Arc<dyn ReportNotifier>,
    store_timeout: Duration,
}

impl ReportLifecycleManager {
    pub fn new(jobs: Arc<dyn JobStore>, notifier: Arc<dyn ReportNotifier>) -> Self {
        Self {
            jobs,
            notifier,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Queue a new job.
    pub async fn create(
        &self,
        user_id: i64,
        district_id: i64,
        report_type: ReportType,
        report_params: serde_json::Value,
    ) -> Result<ReportJob, ReportError> {
        let report_params = if report_params.is_null() {
            serde_json::json!({})
        } else {
            report_params
        };

        let job = ReportJob::queued(user_id, district_id, report_type, report_params, Utc::now());
        let job = bounded(self.store_timeout, "insert_job", self.jobs.insert(job)).await?;

        tracing::info!(
            report_id = %job.report_id,
            user_id = job.user_id,
            district_id = job.district_id,
            report_type = %job.report_type,
            "Report job queued"
        );
        Ok(job)
    }

    /// Validate a submission and queue it for the calling principal.
    pub async fn submit(
        &self,
        principal: &Principal,
        request: CreateReportRequest,
    ) -> Result<ReportJob, ReportError> {
        request
            .validate()
            .map_err(|e| ReportError::Validation(e.to_string()))?;

        let report_type: ReportType = request
            .report_type
            .parse()
            .map_err(ReportError::UnsupportedReportType)?;

        let district_id = principal.district_id.ok_or_else(|| {
            ReportError::Validation("caller is not associated with a district".to_string())
        })?;

        self.create(principal.user_id, district_id, report_type, request.report_params)
            .await
    }

    pub async fn get(&self, report_id: Uuid) -> Result<ReportJob, ReportError> {
        bounded(self.store_timeout, "find_job", self.jobs.find(report_id))
            .await?
            .ok_or(ReportError::NotFound { report_id })
    }

    /// Fresh read that fails with `NotReady` unless the job is COMPLETED.
    pub async fn require_ready(&self, report_id: Uuid) -> Result<ReportJob, ReportError> {
        let job = self.get(report_id).await?;
        if job.status != ReportStatus::Completed {
            return Err(ReportError::NotReady {
                report_id,
                status: job.status,
            });
        }
        Ok(job)
    }

    pub async fn mark_processing(&self, report_id: Uuid) -> Result<ReportJob, ReportError> {
        self.transition(report_id, ReportStatus::Processing, None, None)
            .await
    }

    pub async fn mark_completed(
        &self,
        report_id: Uuid,
        result_location: &str,
    ) -> Result<ReportJob, ReportError> {
        // Stored verbatim; only an all-blank location is refused.
        if result_location.trim().is_empty() {
            return Err(ReportError::Validation(
                "resultLocation is required to complete a report".to_string(),
            ));
        }
        self.transition(
            report_id,
            ReportStatus::Completed,
            Some(result_location.to_string()),
            None,
        )
        .await
    }

    pub async fn mark_failed(
        &self,
        report_id: Uuid,
        reason: &str,
    ) -> Result<ReportJob, ReportError> {
        let reason = reason.trim();
        tracing::warn!(report_id = %report_id, reason = %reason, "Marking report as failed");
        let reason = (!reason.is_empty()).then(|| reason.to_string());
        self.transition(report_id, ReportStatus::Failed, None, reason)
            .await
    }

    /// Apply a lifecycle event from a worker.
    ///
    /// A repeat delivery of the state the job is already in is acknowledged
    /// with `applied: false`. Any other illegal move is an error.
    pub async fn apply_event(
        &self,
        report_id: Uuid,
        event: ReportLifecycleEvent,
    ) -> Result<TransitionOutcome, ReportError> {
        let result = match event.status {
            ReportStatus::Queued => {
                return Err(ReportError::Validation(
                    "workers cannot move a report back to QUEUED".to_string(),
                ))
            }
            ReportStatus::Processing => self.mark_processing(report_id).await,
            ReportStatus::Completed => {
                let location = event.result_location.as_deref().unwrap_or_default();
                self.mark_completed(report_id, location).await
            }
            ReportStatus::Failed => {
                self.mark_failed(report_id, event.reason.as_deref().unwrap_or_default())
                    .await
            }
        };

        match result {
            Ok(job) => Ok(TransitionOutcome { job, applied: true }),
            Err(ReportError::IllegalTransition { from, to, .. }) if from == to => {
                tracing::debug!(
                    report_id = %report_id,
                    status = %to,
                    "Duplicate lifecycle event ignored"
                );
                let job = self.get(report_id).await?;
                Ok(TransitionOutcome {
                    job,
                    applied: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Jobs owned by a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ReportJob>, ReportError> {
        bounded(
            self.store_timeout,
            "list_jobs_for_user",
            self.jobs.list_for_user(user_id, clamp_limit(limit)),
        )
        .await
    }

    /// Jobs in a district with exactly `status`, newest first.
    pub async fn list_for_district(
        &self,
        district_id: i64,
        status: ReportStatus,
        limit: Option<i64>,
    ) -> Result<Vec<ReportJob>, ReportError> {
        bounded(
            self.store_timeout,
            "list_jobs_for_district",
            self.jobs
                .list_for_district(district_id, status, clamp_limit(limit)),
        )
        .await
    }

    /// Remove a job. Callers revoke its tokens.
    pub async fn delete(&self, report_id: Uuid) -> Result<(), ReportError> {
        let deleted = bounded(self.store_timeout, "delete_job", self.jobs.delete(report_id)).await?;
        if !deleted {
            return Err(ReportError::NotFound { report_id });
        }
        tracing::info!(report_id = %report_id, "Report job deleted");
        Ok(())
    }

    /// Queue a fresh copy of a finished job.
    ///
    /// Only terminal jobs may be regenerated. The new job has a new id and
    /// the same owner, type and parameters.
    pub async fn regenerate(&self, report_id: Uuid) -> Result<ReportJob, ReportError> {
        let previous = self.get(report_id).await?;
        if !previous.status.is_terminal() {
            return Err(ReportError::IllegalTransition {
                report_id,
                from: previous.status,
                to: ReportStatus::Queued,
            });
        }

        let job = self
            .create(
                previous.user_id,
                previous.district_id,
                previous.report_type,
                previous.report_params,
            )
            .await?;
        tracing::info!(
            report_id = %job.report_id,
            previous_report_id = %report_id,
            "Report regenerated"
        );
        Ok(job)
    }

    async fn transition(
        &self,
        report_id: Uuid,
        to: ReportStatus,
        result_location: Option<String>,
        failure_reason: Option<String>,
    ) -> Result<ReportJob, ReportError> {
        let change = StatusTransition {
            report_id,
            from: to.allowed_sources(),
            to,
            result_location,
            failure_reason,
            at: Utc::now(),
        };

        let updated = bounded(self.store_timeout, "transition_job", self.jobs.transition(change))
            .await?;

        let Some(job) = updated else {
            // Guard did not hold: tell a missing job apart from a wrong state.
            let current = bounded(self.store_timeout, "find_job", self.jobs.find(report_id)).await?;
            return match current {
                None => Err(ReportError::NotFound { report_id }),
                Some(current) => {
                    tracing::warn!(
                        report_id = %report_id,
                        from = %current.status,
                        to = %to,
                        "Rejected illegal report transition"
                    );
                    Err(ReportError::IllegalTransition {
                        report_id,
                        from: current.status,
                        to,
                    })
                }
            };
        };

        tracing::info!(report_id = %report_id, status = %job.status, "Report status changed");

        if job.status.is_terminal() {
            self.notify(&job).await;
        }
        Ok(job)
    }

    async fn notify(&self, job: &ReportJob) {
        let notification = ReportNotification::for_job(job, Utc::now());
        if let NotificationResult::Failed(reason) = self.notifier.notify(notification).await {
            tracing::error!(
                report_id = %job.report_id,
                error = %reason,
                "Failed to enqueue report notification"
            );
        }
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
