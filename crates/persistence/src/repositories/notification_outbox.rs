//! Report notification outbox.
//!
//! Notifications are written to `report_notifications` and picked up by the
//! mailer out of band. Enqueue failures are reported, not raised.

use async_trait::async_trait;
use domain::services::{NotificationResult, ReportNotification, ReportNotifier};
use sqlx::PgPool;

use crate::metrics::QueryTimer;

/// Outbox-backed [`ReportNotifier`].
#[derive(Clone)]
pub struct NotificationOutboxRepository {
    pool: PgPool,
}

impl NotificationOutboxRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportNotifier for NotificationOutboxRepository {
    async fn notify(&self, notification: ReportNotification) -> NotificationResult {
        let timer = QueryTimer::new("insert_report_notification");
        let result = sqlx::query(
            r#"
            INSERT INTO report_notifications (report_id, user_id, district_id, report_type,
                                              status, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.report_id)
        .bind(notification.user_id)
        .bind(notification.district_id)
        .bind(notification.report_type.as_str())
        .bind(notification.status.code())
        .bind(&notification.reason)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await;
        timer.record();

        match result {
            Ok(_) => NotificationResult::Queued,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }
}
