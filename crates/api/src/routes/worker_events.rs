//! Lifecycle events posted by report workers.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{LifecycleEventAck, ReportLifecycleEvent};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::WorkerAuth;
use crate::middleware::metrics::record_report_transition;

/// Apply a worker's status update.
///
/// POST /api/internal/v1/reports/:report_id/events
///
/// Redelivery of a state the job already holds is acknowledged with
/// `applied: false` so at-least-once queues can ack it.
pub async fn apply_event(
    State(state): State<AppState>,
    worker: WorkerAuth,
    Path(report_id): Path<Uuid>,
    Json(event): Json<ReportLifecycleEvent>,
) -> Result<Json<LifecycleEventAck>, ApiError> {
    let requested = event.status;
    let outcome = state.reports.apply_event(report_id, event).await?;

    if outcome.applied {
        record_report_transition(outcome.job.status);
    }
    info!(
        report_id = %report_id,
        status = %requested,
        applied = outcome.applied,
        worker = %worker.key_fingerprint,
        "Lifecycle event processed"
    );

    Ok(Json(LifecycleEventAck {
        report_id,
        status: outcome.job.status,
        applied: outcome.applied,
    }))
}
