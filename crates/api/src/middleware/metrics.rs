//! Prometheus metrics.
//!
//! HTTP request metrics plus the report and download token counters the
//! routes and background jobs record.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::{ReportStatus, ReportType};
use domain::services::SweepReport;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
///
/// `path` is the matched route template, so download tokens and report ids
/// never become label values.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

pub fn record_report_created(report_type: ReportType) {
    counter!("reports_created_total", "report_type" => report_type.as_str()).increment(1);
}

/// Count an applied lifecycle transition.
pub fn record_report_transition(status: ReportStatus) {
    counter!("report_transitions_total", "status" => status.as_str()).increment(1);
}

pub fn record_download_token_issued() {
    counter!("download_tokens_issued_total").increment(1);
}

/// Count a redemption attempt by outcome (`ok`, `not_found`, `expired`, `error`).
pub fn record_download_redemption(outcome: &'static str) {
    counter!("download_redemptions_total", "outcome" => outcome).increment(1);
}

pub fn record_token_sweep(report: &SweepReport) {
    counter!("download_tokens_swept_total", "reason" => "expired").increment(report.expired);
    counter!("download_tokens_swept_total", "reason" => "orphaned").increment(report.orphaned);
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once during application startup before any metrics are
/// recorded. Until then every `counter!`/`histogram!` call is a no-op.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0])?
        .install_recorder()?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Prometheus handle already initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_to_str() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::POST), "POST");
        assert_eq!(method_to_str(&Method::PUT), "PUT");
        assert_eq!(method_to_str(&Method::DELETE), "DELETE");
        assert_eq!(method_to_str(&Method::PATCH), "PATCH");
        assert_eq!(method_to_str(&Method::HEAD), "HEAD");
        assert_eq!(method_to_str(&Method::OPTIONS), "OPTIONS");
    }

    #[test]
    fn test_method_to_str_other() {
        assert_eq!(method_to_str(&Method::TRACE), "OTHER");
    }

    #[test]
    fn test_business_counters_without_recorder() {
        record_report_created(ReportType::DummyTest);
        record_report_transition(ReportStatus::Completed);
        record_download_token_issued();
        record_download_redemption("ok");
        record_token_sweep(&SweepReport {
            expired: 2,
            orphaned: 1,
        });
    }

    #[tokio::test]
    async fn test_metrics_handler_before_init() {
        let response = metrics_handler().await.into_response();
        // The recorder is only installed by the binary.
        assert!(PROMETHEUS_HANDLE.get().is_none());
        assert_eq!(response.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
