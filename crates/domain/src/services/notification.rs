//! Report completion notifications.
//!
//! When a job reaches a terminal state the lifecycle manager hands a
//! [`ReportNotification`] to a [`ReportNotifier`]. Delivery (email, push) is
//! someone else's job; notifiers only enqueue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{ReportJob, ReportStatus, ReportType};

/// Payload emitted when a report finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportNotification {
    pub report_id: Uuid,
    pub user_id: i64,
    pub district_id: i64,
    pub report_type: ReportType,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReportNotification {
    /// Build from a job that just reached a terminal state.
    pub fn for_job(job: &ReportJob, now: DateTime<Utc>) -> Self {
        Self {
            report_id: job.report_id,
            user_id: job.user_id,
            district_id: job.district_id,
            report_type: job.report_type,
            status: job.status,
            reason: job.failure_reason.clone(),
            created_at: now,
        }
    }
}

/// Result of a notification enqueue attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// Notification was accepted for delivery.
    Queued,
    /// Enqueue failed. Never propagated to the lifecycle caller.
    Failed(String),
}

/// Collaborator that accepts report notifications.
#[async_trait::async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn notify(&self, notification: ReportNotification) -> NotificationResult;
}

/// Notifier that keeps everything in memory.
///
/// Used by tests and when no outbox is configured.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Mutex<Vec<ReportNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier that rejects every notification.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            sent: Mutex::default(),
        }
    }

    /// Notifications accepted so far, oldest first.
    pub async fn sent(&self) -> Vec<ReportNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ReportNotifier for RecordingNotifier {
    async fn notify(&self, notification: ReportNotification) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!(
                report_id = %notification.report_id,
                "Recording notifier simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::debug!(
            report_id = %notification.report_id,
            status = %notification.status,
            "Recorded report notification"
        );
        self.sent.lock().await.push(notification);
        NotificationResult::Queued
    }
}
